use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  #[sea_orm(unique)]
  pub name: String,
  pub description: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::course::Entity")]
  Courses,
}

impl Related<super::course::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Courses.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
