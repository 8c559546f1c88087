pub use sea_orm_migration::prelude::*;

mod m20260901_000001_create_users;
mod m20260901_000002_create_catalog;
mod m20260901_000003_create_enrollments;
mod m20260901_000004_create_course_progress;
mod m20260901_000005_create_groups;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260901_000001_create_users::Migration),
      Box::new(m20260901_000002_create_catalog::Migration),
      Box::new(m20260901_000003_create_enrollments::Migration),
      Box::new(m20260901_000004_create_course_progress::Migration),
      Box::new(m20260901_000005_create_groups::Migration),
    ]
  }
}
