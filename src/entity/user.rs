use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  Hash,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
  #[sea_orm(string_value = "student")]
  Student,
  #[sea_orm(string_value = "instructor")]
  Instructor,
  #[sea_orm(string_value = "admin")]
  Admin,
}

impl Default for Role {
  fn default() -> Self {
    Self::Student
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  #[sea_orm(unique)]
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role: Role,
  pub created_at: DateTime,
}

impl Model {
  pub fn is_instructor(&self) -> bool {
    self.role == Role::Instructor
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::token::Entity")]
  Tokens,
  #[sea_orm(has_many = "super::enrollment::Entity")]
  Enrollments,
  #[sea_orm(has_many = "super::course::Entity")]
  Courses,
}

impl Related<super::token::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Tokens.def()
  }
}

impl Related<super::enrollment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Enrollments.def()
  }
}

impl Related<super::course::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Courses.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
