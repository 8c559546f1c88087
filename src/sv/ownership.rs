//! Resolution of the course that owns a catalog item

use async_trait::async_trait;
use sea_orm::JoinType;

use crate::{
  entity::{course, lesson, material, module, user},
  prelude::*,
};

#[async_trait]
pub trait OwnsCourse: Sync {
  async fn owning_course<C>(&self, db: &C) -> Result<course::Model>
  where
    C: ConnectionTrait;

  /// The owning course, if `user` is its instructor or an admin.
  async fn managed_by<C>(
    &self,
    db: &C,
    user: &user::Model,
  ) -> Result<course::Model>
  where
    C: ConnectionTrait,
  {
    let course = self.owning_course(db).await?;
    if user.is_admin() || course.instructor_id == user.id {
      Ok(course)
    } else {
      Err(Error::Forbidden)
    }
  }
}

#[async_trait]
impl OwnsCourse for course::Model {
  async fn owning_course<C>(&self, _db: &C) -> Result<course::Model>
  where
    C: ConnectionTrait,
  {
    Ok(self.clone())
  }
}

#[async_trait]
impl OwnsCourse for module::Model {
  async fn owning_course<C>(&self, db: &C) -> Result<course::Model>
  where
    C: ConnectionTrait,
  {
    course::Entity::find_by_id(self.course_id)
      .one(db)
      .await?
      .ok_or(Error::NotFound("Course"))
  }
}

#[async_trait]
impl OwnsCourse for lesson::Model {
  async fn owning_course<C>(&self, db: &C) -> Result<course::Model>
  where
    C: ConnectionTrait,
  {
    course::Entity::find()
      .join(JoinType::InnerJoin, course::Relation::Modules.def())
      .filter(module::Column::Id.eq(self.module_id))
      .one(db)
      .await?
      .ok_or(Error::NotFound("Course"))
  }
}

#[async_trait]
impl OwnsCourse for material::Model {
  async fn owning_course<C>(&self, db: &C) -> Result<course::Model>
  where
    C: ConnectionTrait,
  {
    course::Entity::find()
      .join(JoinType::InnerJoin, course::Relation::Modules.def())
      .join(JoinType::InnerJoin, module::Relation::Lessons.def())
      .filter(lesson::Column::Id.eq(self.lesson_id))
      .one(db)
      .await?
      .ok_or(Error::NotFound("Course"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::Role, sv::testing};

  #[tokio::test]
  async fn test_every_item_resolves_to_its_course() {
    let db = testing::db().await;
    let owner = testing::user(&db, "owner", Role::Instructor).await;
    let course = testing::course(&db, &owner, "Ownership", 0).await;
    let module = testing::module(&db, &course, 1).await;
    let lesson = testing::lesson(&db, &module, 1).await;
    let material = testing::material(&db, &lesson).await;

    assert_eq!(course.owning_course(&db).await.unwrap().id, course.id);
    assert_eq!(module.owning_course(&db).await.unwrap().id, course.id);
    assert_eq!(lesson.owning_course(&db).await.unwrap().id, course.id);
    assert_eq!(material.owning_course(&db).await.unwrap().id, course.id);
  }

  #[tokio::test]
  async fn test_managed_by_checks_owner() {
    let db = testing::db().await;
    let owner = testing::user(&db, "owner", Role::Instructor).await;
    let other = testing::user(&db, "other", Role::Instructor).await;
    let admin = testing::user(&db, "admin", Role::Admin).await;
    let course = testing::course(&db, &owner, "Managed", 0).await;
    let module = testing::module(&db, &course, 1).await;

    assert!(module.managed_by(&db, &owner).await.is_ok());
    assert!(module.managed_by(&db, &admin).await.is_ok());
    assert!(matches!(
      module.managed_by(&db, &other).await,
      Err(Error::Forbidden)
    ));
  }
}
