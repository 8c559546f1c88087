use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_modules")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  pub course_id: i64,
  pub title: String,
  pub description: Option<String>,
  /// Unique within the course
  pub order: i32,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::course::Entity",
    from = "Column::CourseId",
    to = "super::course::Column::Id",
    on_delete = "Cascade"
  )]
  Course,
  #[sea_orm(has_many = "super::lesson::Entity")]
  Lessons,
}

impl Related<super::course::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Course.def()
  }
}

impl Related<super::lesson::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Lessons.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
