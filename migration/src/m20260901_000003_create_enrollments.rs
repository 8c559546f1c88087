use sea_orm_migration::prelude::*;

use super::{
  m20260901_000001_create_users::Users,
  m20260901_000002_create_catalog::Courses,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Enrollments::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Enrollments::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Enrollments::UserId).big_integer().not_null())
          .col(ColumnDef::new(Enrollments::CourseId).big_integer().not_null())
          .col(ColumnDef::new(Enrollments::EnrolledAt).date_time().not_null())
          .col(
            ColumnDef::new(Enrollments::PaymentStatus)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(
            ColumnDef::new(Enrollments::AmountPaid)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Enrollments::Completed)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Enrollments::CompletedAt).date_time().null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_enrollments_user")
              .from(Enrollments::Table, Enrollments::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_enrollments_course")
              .from(Enrollments::Table, Enrollments::CourseId)
              .to(Courses::Table, Courses::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_enrollments_user_course")
          .table(Enrollments::Table)
          .col(Enrollments::UserId)
          .col(Enrollments::CourseId)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Enrollments::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Enrollments {
  Table,
  Id,
  UserId,
  CourseId,
  EnrolledAt,
  PaymentStatus,
  AmountPaid,
  Completed,
  CompletedAt,
}
