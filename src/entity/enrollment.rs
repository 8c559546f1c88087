//! Enrollment entity - one row per (user, course)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
  Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  #[sea_orm(string_value = "pending")]
  Pending,
  #[sea_orm(string_value = "completed")]
  Completed,
  #[sea_orm(string_value = "failed")]
  Failed,
  #[sea_orm(string_value = "refunded")]
  Refunded,
  #[sea_orm(string_value = "free")]
  Free,
}

impl PaymentStatus {
  /// Whether the enrollment counts as an active student with content access
  pub fn grants_access(self) -> bool {
    matches!(self, Self::Completed | Self::Free)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Completed => "completed",
      Self::Failed => "failed",
      Self::Refunded => "refunded",
      Self::Free => "free",
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  pub user_id: i64,
  pub course_id: i64,
  pub enrolled_at: DateTime,
  pub payment_status: PaymentStatus,
  /// Cents
  pub amount_paid: i64,
  pub completed: bool,
  pub completed_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::UserId",
    to = "super::user::Column::Id",
    on_delete = "Cascade"
  )]
  User,
  #[sea_orm(
    belongs_to = "super::course::Entity",
    from = "Column::CourseId",
    to = "super::course::Column::Id",
    on_delete = "Cascade"
  )]
  Course,
  #[sea_orm(has_many = "super::progress::Entity")]
  Progress,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl Related<super::course::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Course.def()
  }
}

impl Related<super::progress::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Progress.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
