//! Enrollment lifecycle and the course's active-student count

use sea_orm::{Condition, JoinType, sea_query::Expr};

use crate::{
  entity::{CourseStatus, PaymentStatus, course, enrollment, lesson, module, user},
  prelude::*,
  sv::{OwnsCourse, progress},
};

#[derive(Debug, Clone)]
pub enum Enrolled {
  /// Free course, access granted immediately
  Granted(enrollment::Model),
  /// Paid course, access withheld until payment is confirmed
  PaymentRequired { enrollment: enrollment::Model, price: i64 },
}

impl Enrolled {
  pub fn enrollment(&self) -> &enrollment::Model {
    match self {
      Enrolled::Granted(enrollment) => enrollment,
      Enrolled::PaymentRequired { enrollment, .. } => enrollment,
    }
  }
}

/// Seat claim guard: capacity left, optionally also open for enrollment.
fn seat_condition(open_only: bool) -> Condition {
  let capacity = Condition::any()
    .add(course::Column::MaxStudents.eq(0))
    .add(
      Expr::col(course::Column::StudentCount)
        .lt(Expr::col(course::Column::MaxStudents)),
    );

  if open_only {
    Condition::all()
      .add(capacity)
      .add(course::Column::AllowEnrollment.eq(true))
      .add(course::Column::Status.eq(CourseStatus::Published))
  } else {
    capacity
  }
}

/// Atomically takes one seat. `false` when the guard rejected the update.
async fn claim_seat<C>(db: &C, course_id: i64, open_only: bool) -> Result<bool>
where
  C: ConnectionTrait,
{
  let res = course::Entity::update_many()
    .col_expr(
      course::Column::StudentCount,
      Expr::col(course::Column::StudentCount).add(1),
    )
    .filter(course::Column::Id.eq(course_id))
    .filter(seat_condition(open_only))
    .exec(db)
    .await?;

  Ok(res.rows_affected == 1)
}

async fn release_seat<C>(db: &C, course_id: i64) -> Result<()>
where
  C: ConnectionTrait,
{
  course::Entity::update_many()
    .col_expr(
      course::Column::StudentCount,
      Expr::col(course::Column::StudentCount).sub(1),
    )
    .filter(course::Column::Id.eq(course_id))
    .filter(course::Column::StudentCount.gt(0))
    .exec(db)
    .await?;

  Ok(())
}

/// Conditional status transition, `false` if the row was not in `from`.
async fn transition<C>(
  db: &C,
  enrollment_id: i64,
  from: PaymentStatus,
  to: PaymentStatus,
) -> Result<bool>
where
  C: ConnectionTrait,
{
  let res = enrollment::Entity::update_many()
    .col_expr(enrollment::Column::PaymentStatus, Expr::value(to))
    .filter(enrollment::Column::Id.eq(enrollment_id))
    .filter(enrollment::Column::PaymentStatus.eq(from))
    .exec(db)
    .await?;

  Ok(res.rows_affected == 1)
}

async fn find_by_id<C>(db: &C, id: i64) -> Result<enrollment::Model>
where
  C: ConnectionTrait,
{
  enrollment::Entity::find_by_id(id)
    .one(db)
    .await?
    .ok_or(Error::NotFound("Enrollment"))
}

async fn find_for<C>(
  db: &C,
  user_id: i64,
  course_id: i64,
) -> Result<Option<enrollment::Model>>
where
  C: ConnectionTrait,
{
  Ok(
    enrollment::Entity::find()
      .filter(enrollment::Column::UserId.eq(user_id))
      .filter(enrollment::Column::CourseId.eq(course_id))
      .one(db)
      .await?,
  )
}

async fn insert<C>(
  db: &C,
  user_id: i64,
  course_id: i64,
  status: PaymentStatus,
) -> Result<enrollment::Model>
where
  C: ConnectionTrait,
{
  enrollment::ActiveModel {
    id: NotSet,
    user_id: Set(user_id),
    course_id: Set(course_id),
    enrolled_at: Set(utils::now()),
    payment_status: Set(status),
    amount_paid: Set(0),
    completed: Set(false),
    completed_at: Set(None),
  }
  .insert(db)
  .await
  .map_err(|err| Error::on_unique(err, Error::AlreadyEnrolled))
}

pub struct Enrollment<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Enrollment<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn enroll(
    &self,
    user: &user::Model,
    course_id: i64,
  ) -> Result<Enrolled> {
    let course = course::Entity::find_by_id(course_id)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound("Course"))?;

    // rolled back on drop unless committed
    let txn = self.db.begin().await?;

    if !course.is_paid {
      if !claim_seat(&txn, course.id, true).await? {
        return Err(match find_for(&txn, user.id, course.id).await? {
          Some(_) => Error::AlreadyEnrolled,
          None => Error::EnrollmentClosed,
        });
      }

      let enrollment = insert(&txn, user.id, course.id, PaymentStatus::Free).await?;
      txn.commit().await?;

      info!("User {} enrolled in free course {}", user.id, course.id);
      return Ok(Enrolled::Granted(enrollment));
    }

    // the insert takes the write lock before the course is re-read
    let enrollment =
      insert(&txn, user.id, course.id, PaymentStatus::Pending).await?;

    let fresh = course::Entity::find_by_id(course.id)
      .one(&txn)
      .await?
      .ok_or(Error::NotFound("Course"))?;
    if !fresh.is_available() {
      return Err(Error::EnrollmentClosed);
    }

    txn.commit().await?;

    let price = fresh.current_price(utils::now());
    info!(
      "User {} has a pending enrollment in course {} ({})",
      user.id,
      fresh.id,
      utils::format_price(price)
    );
    Ok(Enrolled::PaymentRequired { enrollment, price })
  }

  pub async fn confirm_payment(
    &self,
    enrollment_id: i64,
  ) -> Result<enrollment::Model> {
    let txn = self.db.begin().await?;

    if !transition(
      &txn,
      enrollment_id,
      PaymentStatus::Pending,
      PaymentStatus::Completed,
    )
    .await?
    {
      let enrollment = find_by_id(&txn, enrollment_id).await?;
      return match enrollment.payment_status {
        PaymentStatus::Completed | PaymentStatus::Free => Ok(enrollment),
        from => Err(Error::InvalidTransition { from }),
      };
    }

    let enrollment = find_by_id(&txn, enrollment_id).await?;
    if !claim_seat(&txn, enrollment.course_id, false).await? {
      return Err(Error::EnrollmentClosed);
    }

    let course = course::Entity::find_by_id(enrollment.course_id)
      .one(&txn)
      .await?
      .ok_or(Error::NotFound("Course"))?;

    let enrollment = enrollment::ActiveModel {
      amount_paid: Set(course.current_price(utils::now())),
      ..enrollment.into()
    }
    .update(&txn)
    .await?;

    txn.commit().await?;

    info!(
      "Payment confirmed for enrollment {} ({})",
      enrollment.id,
      utils::format_price(enrollment.amount_paid)
    );
    Ok(enrollment)
  }

  pub async fn fail_payment(
    &self,
    enrollment_id: i64,
  ) -> Result<enrollment::Model> {
    let txn = self.db.begin().await?;

    let moved = transition(
      &txn,
      enrollment_id,
      PaymentStatus::Pending,
      PaymentStatus::Failed,
    )
    .await?;
    let enrollment = find_by_id(&txn, enrollment_id).await?;

    if !moved && enrollment.payment_status != PaymentStatus::Failed {
      return Err(Error::InvalidTransition { from: enrollment.payment_status });
    }

    txn.commit().await?;
    warn!("Payment failed for enrollment {}", enrollment.id);
    Ok(enrollment)
  }

  pub async fn refund(&self, enrollment_id: i64) -> Result<enrollment::Model> {
    let txn = self.db.begin().await?;

    let moved = transition(
      &txn,
      enrollment_id,
      PaymentStatus::Completed,
      PaymentStatus::Refunded,
    )
    .await?;
    let enrollment = find_by_id(&txn, enrollment_id).await?;

    if moved {
      release_seat(&txn, enrollment.course_id).await?;
    } else if enrollment.payment_status != PaymentStatus::Refunded {
      return Err(Error::InvalidTransition { from: enrollment.payment_status });
    }

    txn.commit().await?;
    info!("Enrollment {} refunded", enrollment.id);
    Ok(enrollment)
  }

  /// Instructor override: completes the enrollment and every lesson of it.
  pub async fn mark_course_complete(
    &self,
    actor: &user::Model,
    enrollment_id: i64,
  ) -> Result<enrollment::Model> {
    let enrollment = find_by_id(self.db, enrollment_id).await?;
    let course = course::Entity::find_by_id(enrollment.course_id)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound("Course"))?;
    course.managed_by(self.db, actor).await?;

    let txn = self.db.begin().await?;

    let lessons: Vec<i64> = lesson::Entity::find()
      .select_only()
      .column(lesson::Column::Id)
      .join(JoinType::InnerJoin, lesson::Relation::Module.def())
      .filter(module::Column::CourseId.eq(course.id))
      .into_tuple()
      .all(&txn)
      .await?;

    for lesson_id in lessons {
      progress::complete_lesson(&txn, enrollment.id, lesson_id).await?;
    }

    let enrollment = enrollment::ActiveModel {
      completed: Set(true),
      completed_at: Set(Some(utils::now())),
      ..enrollment.into()
    }
    .update(&txn)
    .await?;

    txn.commit().await?;

    info!(
      "Enrollment {} force-completed by user {}",
      enrollment.id, actor.id
    );
    Ok(enrollment)
  }

  pub async fn for_user(
    &self,
    user_id: i64,
    course_id: i64,
  ) -> Result<Option<enrollment::Model>> {
    find_for(self.db, user_id, course_id).await
  }

  /// Enrollment visible to `viewer`: their own, one in a course they teach,
  /// or any for admins.
  pub async fn visible(
    &self,
    viewer: &user::Model,
    enrollment_id: i64,
  ) -> Result<enrollment::Model> {
    let enrollment = find_by_id(self.db, enrollment_id).await?;
    if viewer.is_admin() || enrollment.user_id == viewer.id {
      return Ok(enrollment);
    }

    let teaches = course::Entity::find_by_id(enrollment.course_id)
      .filter(course::Column::InstructorId.eq(viewer.id))
      .count(self.db)
      .await?;

    if teaches > 0 { Ok(enrollment) } else { Err(Error::NotFound("Enrollment")) }
  }

  pub async fn list(&self, viewer: &user::Model) -> Result<Vec<enrollment::Model>> {
    let query = enrollment::Entity::find();

    let query = if viewer.is_admin() {
      query
    } else if viewer.is_instructor() {
      query
        .join(JoinType::InnerJoin, enrollment::Relation::Course.def())
        .filter(course::Column::InstructorId.eq(viewer.id))
    } else {
      query.filter(enrollment::Column::UserId.eq(viewer.id))
    };

    Ok(query.order_by_desc(enrollment::Column::EnrolledAt).all(self.db).await?)
  }
}
