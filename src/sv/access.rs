//! Read access to course content and lesson video

use serde::Serialize;

use crate::{
  entity::{PaymentStatus, course, enrollment, lesson, user},
  prelude::*,
  sv::OwnsCourse,
};

#[derive(Debug, Clone, Serialize)]
pub struct AccessCheck {
  pub has_access: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_free: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub enrollment_id: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_status: Option<PaymentStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price: Option<String>,
}

/// Content rule for an authenticated user. Owners and admins always pass,
/// free courses are open, paid ones need a paid or free enrollment.
pub fn grants(
  course: &course::Model,
  user: &user::Model,
  enrollment: Option<&enrollment::Model>,
) -> bool {
  if user.is_admin() || course.instructor_id == user.id || !course.is_paid {
    return true;
  }
  enrollment.is_some_and(|e| {
    e.user_id == user.id
      && e.course_id == course.id
      && e.payment_status.grants_access()
  })
}

pub struct Access<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Access<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  async fn enrollment(
    &self,
    user: &user::Model,
    course: &course::Model,
  ) -> Result<Option<enrollment::Model>> {
    Ok(
      enrollment::Entity::find()
        .filter(enrollment::Column::UserId.eq(user.id))
        .filter(enrollment::Column::CourseId.eq(course.id))
        .one(self.db)
        .await?,
    )
  }

  /// Anonymous callers never see content.
  pub async fn has_content_access(
    &self,
    user: Option<&user::Model>,
    course: &course::Model,
  ) -> Result<bool> {
    let Some(user) = user else {
      return Ok(false);
    };

    if grants(course, user, None) {
      return Ok(true);
    }

    let enrollment = self.enrollment(user, course).await?;
    Ok(grants(course, user, enrollment.as_ref()))
  }

  /// Preview lessons are open to every authenticated user.
  pub async fn has_video_access(
    &self,
    user: Option<&user::Model>,
    lesson: &lesson::Model,
  ) -> Result<bool> {
    if user.is_none() {
      return Ok(false);
    }
    if lesson.is_preview {
      return Ok(true);
    }

    let course = lesson.owning_course(self.db).await?;
    self.has_content_access(user, &course).await
  }

  pub async fn require_content(
    &self,
    user: &user::Model,
    course: &course::Model,
  ) -> Result<()> {
    if self.has_content_access(Some(user), course).await? {
      Ok(())
    } else {
      debug!("User {} denied content of course {}", user.id, course.id);
      Err(Error::NotEnrolled)
    }
  }

  pub async fn check(
    &self,
    user: &user::Model,
    course: &course::Model,
  ) -> Result<AccessCheck> {
    let enrollment = self.enrollment(user, course).await?;
    let has_access = grants(course, user, enrollment.as_ref());

    let price = course
      .is_paid
      .then(|| utils::format_price(course.current_price(utils::now())));

    Ok(AccessCheck {
      has_access,
      is_free: Some(!course.is_paid),
      enrollment_id: enrollment.as_ref().map(|e| e.id),
      payment_status: enrollment.map(|e| e.payment_status),
      price,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::Role, sv::testing};

  #[tokio::test]
  async fn test_free_course_open_to_authenticated() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let student = testing::user(&db, "student", Role::Student).await;
    let course = testing::course(&db, &owner, "Free", 0).await;
    let access = Access::new(&db);

    assert!(access.has_content_access(Some(&student), &course).await.unwrap());
    assert!(!access.has_content_access(None, &course).await.unwrap());
  }

  #[tokio::test]
  async fn test_paid_course_by_payment_status() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let course = testing::course(&db, &owner, "Paid", 1000).await;
    let access = Access::new(&db);

    for (name, status, expected) in [
      ("pending", PaymentStatus::Pending, false),
      ("failed", PaymentStatus::Failed, false),
      ("refunded", PaymentStatus::Refunded, false),
      ("completed", PaymentStatus::Completed, true),
      ("free", PaymentStatus::Free, true),
    ] {
      let student = testing::user(&db, name, Role::Student).await;
      testing::enrollment(&db, &student, &course, status).await;
      assert_eq!(
        access.has_content_access(Some(&student), &course).await.unwrap(),
        expected,
        "{name}"
      );
    }

    let stranger = testing::user(&db, "stranger", Role::Student).await;
    assert!(!access.has_content_access(Some(&stranger), &course).await.unwrap());
    assert!(access.has_content_access(Some(&owner), &course).await.unwrap());
  }

  #[tokio::test]
  async fn test_preview_lesson_bypasses_enrollment() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let student = testing::user(&db, "student", Role::Student).await;
    let course = testing::course(&db, &owner, "Paid", 1000).await;
    let module = testing::module(&db, &course, 1).await;
    let locked = testing::lesson(&db, &module, 1).await;
    let preview = lesson::ActiveModel {
      is_preview: Set(true),
      ..testing::lesson(&db, &module, 2).await.into()
    }
    .update(&db)
    .await
    .unwrap();
    let access = Access::new(&db);

    assert!(!access.has_video_access(Some(&student), &locked).await.unwrap());
    assert!(access.has_video_access(Some(&student), &preview).await.unwrap());
    assert!(!access.has_video_access(None, &preview).await.unwrap());
  }

  #[tokio::test]
  async fn test_check_reports_enrollment() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let student = testing::user(&db, "student", Role::Student).await;
    let course = testing::course(&db, &owner, "Paid", 1000).await;
    let enrollment =
      testing::enrollment(&db, &student, &course, PaymentStatus::Pending).await;

    let check = Access::new(&db).check(&student, &course).await.unwrap();
    assert!(!check.has_access);
    assert_eq!(check.is_free, Some(false));
    assert_eq!(check.enrollment_id, Some(enrollment.id));
    assert_eq!(check.price.as_deref(), Some("10.00"));
  }
}
