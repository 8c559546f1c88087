use sea_orm_migration::prelude::*;

use super::{
  m20260901_000002_create_catalog::Lessons,
  m20260901_000003_create_enrollments::Enrollments,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(CourseProgress::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(CourseProgress::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(CourseProgress::EnrollmentId)
              .big_integer()
              .not_null(),
          )
          .col(ColumnDef::new(CourseProgress::LessonId).big_integer().not_null())
          .col(
            ColumnDef::new(CourseProgress::Completed)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(CourseProgress::CompletedAt).date_time().null())
          .col(
            ColumnDef::new(CourseProgress::TimeSpent)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(CourseProgress::LastAccessed).date_time().not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_course_progress_enrollment")
              .from(CourseProgress::Table, CourseProgress::EnrollmentId)
              .to(Enrollments::Table, Enrollments::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_course_progress_lesson")
              .from(CourseProgress::Table, CourseProgress::LessonId)
              .to(Lessons::Table, Lessons::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_course_progress_enrollment_lesson")
          .table(CourseProgress::Table)
          .col(CourseProgress::EnrollmentId)
          .col(CourseProgress::LessonId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(CourseProgress::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum CourseProgress {
  Table,
  Id,
  EnrollmentId,
  LessonId,
  Completed,
  CompletedAt,
  TimeSpent,
  LastAccessed,
}
