use sea_orm_migration::prelude::*;

use super::m20260901_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Categories::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Categories::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(Categories::Name).string().not_null().unique_key(),
          )
          .col(ColumnDef::new(Categories::Description).text().null())
          .col(ColumnDef::new(Categories::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Courses::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Courses::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Courses::Title).string().not_null())
          .col(ColumnDef::new(Courses::Slug).string().not_null().unique_key())
          .col(ColumnDef::new(Courses::Description).text().not_null())
          .col(ColumnDef::new(Courses::Price).big_integer().not_null())
          .col(ColumnDef::new(Courses::IsPaid).boolean().not_null())
          .col(
            ColumnDef::new(Courses::HasDiscount)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Courses::DiscountPrice).big_integer().null())
          .col(ColumnDef::new(Courses::DiscountExpiry).date_time().null())
          .col(
            ColumnDef::new(Courses::Status).string().not_null().default("draft"),
          )
          .col(
            ColumnDef::new(Courses::IsPublic).boolean().not_null().default(true),
          )
          .col(
            ColumnDef::new(Courses::AllowEnrollment)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(Courses::MaxStudents)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Courses::StudentCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Courses::DurationHours).integer().null())
          .col(ColumnDef::new(Courses::InstructorId).big_integer().not_null())
          .col(ColumnDef::new(Courses::CategoryId).big_integer().null())
          .col(ColumnDef::new(Courses::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Courses::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_courses_instructor")
              .from(Courses::Table, Courses::InstructorId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_courses_category")
              .from(Courses::Table, Courses::CategoryId)
              .to(Categories::Table, Categories::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_courses_title")
          .table(Courses::Table)
          .col(Courses::Title)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_courses_created_at")
          .table(Courses::Table)
          .col(Courses::CreatedAt)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(CourseModules::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(CourseModules::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(CourseModules::CourseId).big_integer().not_null())
          .col(ColumnDef::new(CourseModules::Title).string().not_null())
          .col(ColumnDef::new(CourseModules::Description).text().null())
          .col(ColumnDef::new(CourseModules::Order).integer().not_null())
          .col(ColumnDef::new(CourseModules::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_course_modules_course")
              .from(CourseModules::Table, CourseModules::CourseId)
              .to(Courses::Table, Courses::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_course_modules_order")
          .table(CourseModules::Table)
          .col(CourseModules::CourseId)
          .col(CourseModules::Order)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Lessons::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Lessons::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Lessons::ModuleId).big_integer().not_null())
          .col(ColumnDef::new(Lessons::Title).string().not_null())
          .col(ColumnDef::new(Lessons::Content).text().not_null().default(""))
          .col(ColumnDef::new(Lessons::Order).integer().not_null())
          .col(ColumnDef::new(Lessons::Duration).integer().null())
          .col(
            ColumnDef::new(Lessons::IsPreview)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Lessons::VideoFile).string().null())
          .col(ColumnDef::new(Lessons::VideoUrl).string().null())
          .col(ColumnDef::new(Lessons::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_lessons_module")
              .from(Lessons::Table, Lessons::ModuleId)
              .to(CourseModules::Table, CourseModules::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_lessons_order")
          .table(Lessons::Table)
          .col(Lessons::ModuleId)
          .col(Lessons::Order)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(CourseMaterials::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(CourseMaterials::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(CourseMaterials::LessonId).big_integer().not_null())
          .col(ColumnDef::new(CourseMaterials::Title).string().not_null())
          .col(ColumnDef::new(CourseMaterials::Description).text().null())
          .col(ColumnDef::new(CourseMaterials::FilePath).string().not_null())
          .col(
            ColumnDef::new(CourseMaterials::CreatedAt).date_time().not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_course_materials_lesson")
              .from(CourseMaterials::Table, CourseMaterials::LessonId)
              .to(Lessons::Table, Lessons::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(CourseMaterials::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Lessons::Table).to_owned()).await?;
    manager
      .drop_table(Table::drop().table(CourseModules::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Courses::Table).to_owned()).await?;
    manager.drop_table(Table::drop().table(Categories::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Categories {
  Table,
  Id,
  Name,
  Description,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum Courses {
  Table,
  Id,
  Title,
  Slug,
  Description,
  Price,
  IsPaid,
  HasDiscount,
  DiscountPrice,
  DiscountExpiry,
  Status,
  IsPublic,
  AllowEnrollment,
  MaxStudents,
  StudentCount,
  DurationHours,
  InstructorId,
  CategoryId,
  CreatedAt,
  UpdatedAt,
}

#[derive(DeriveIden)]
pub enum CourseModules {
  Table,
  Id,
  CourseId,
  Title,
  Description,
  Order,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum Lessons {
  Table,
  Id,
  ModuleId,
  Title,
  Content,
  Order,
  Duration,
  IsPreview,
  VideoFile,
  VideoUrl,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum CourseMaterials {
  Table,
  Id,
  LessonId,
  Title,
  Description,
  FilePath,
  CreatedAt,
}
