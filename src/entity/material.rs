use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_materials")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  pub lesson_id: i64,
  pub title: String,
  pub description: Option<String>,
  #[serde(skip_serializing)]
  pub file_path: String,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::lesson::Entity",
    from = "Column::LessonId",
    to = "super::lesson::Column::Id",
    on_delete = "Cascade"
  )]
  Lesson,
}

impl Related<super::lesson::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Lesson.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
