use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_progress")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  pub enrollment_id: i64,
  pub lesson_id: i64,
  pub completed: bool,
  pub completed_at: Option<DateTime>,
  /// Seconds
  pub time_spent: i64,
  pub last_accessed: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::enrollment::Entity",
    from = "Column::EnrollmentId",
    to = "super::enrollment::Column::Id",
    on_delete = "Cascade"
  )]
  Enrollment,
  #[sea_orm(
    belongs_to = "super::lesson::Entity",
    from = "Column::LessonId",
    to = "super::lesson::Column::Id",
    on_delete = "Cascade"
  )]
  Lesson,
}

impl Related<super::enrollment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Enrollment.def()
  }
}

impl Related<super::lesson::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Lesson.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
