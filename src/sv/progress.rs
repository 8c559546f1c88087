//! Per-lesson progress and course completion re-evaluation

use std::collections::HashSet;

use sea_orm::{
  JoinType,
  sea_query::{Expr, OnConflict},
};
use serde::Serialize;

use crate::{
  entity::{course, enrollment, lesson, module, progress, user},
  prelude::*,
  sv::OwnsCourse,
};

#[derive(Debug, Clone, Serialize)]
pub struct ModuleCompletion {
  pub module_id: i64,
  pub module_title: String,
  pub total_lessons: u64,
  pub completed_lessons: u64,
  pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Completion {
  pub enrollment_id: i64,
  pub course_id: i64,
  pub course_title: String,
  pub total_lessons: u64,
  pub completed_lessons: u64,
  pub percentage: u32,
  pub completed: bool,
  pub module_breakdown: Vec<ModuleCompletion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
  pub enrollment_id: i64,
  pub course_id: i64,
  pub course_title: String,
  pub total_lessons: u64,
  pub completed_lessons: u64,
  pub percentage: u32,
  pub completed: bool,
}

pub(crate) async fn lesson_count<C>(db: &C, course_id: i64) -> Result<u64>
where
  C: ConnectionTrait,
{
  Ok(
    lesson::Entity::find()
      .join(JoinType::InnerJoin, lesson::Relation::Module.def())
      .filter(module::Column::CourseId.eq(course_id))
      .count(db)
      .await?,
  )
}

async fn completed_count<C>(db: &C, enrollment: &enrollment::Model) -> Result<u64>
where
  C: ConnectionTrait,
{
  Ok(
    progress::Entity::find()
      .join(JoinType::InnerJoin, progress::Relation::Lesson.def())
      .join(JoinType::InnerJoin, lesson::Relation::Module.def())
      .filter(progress::Column::EnrollmentId.eq(enrollment.id))
      .filter(progress::Column::Completed.eq(true))
      .filter(module::Column::CourseId.eq(enrollment.course_id))
      .count(db)
      .await?,
  )
}

/// Upserts a completed row. `completed_at` is only stamped when the row was
/// not already complete.
pub(crate) async fn complete_lesson<C>(
  db: &C,
  enrollment_id: i64,
  lesson_id: i64,
) -> Result<()>
where
  C: ConnectionTrait,
{
  let now = utils::now();
  let row = progress::ActiveModel {
    id: NotSet,
    enrollment_id: Set(enrollment_id),
    lesson_id: Set(lesson_id),
    completed: Set(true),
    completed_at: Set(Some(now)),
    time_spent: Set(0),
    last_accessed: Set(now),
  };

  progress::Entity::insert(row)
    .on_conflict(
      OnConflict::columns([
        progress::Column::EnrollmentId,
        progress::Column::LessonId,
      ])
      .update_columns([progress::Column::Completed, progress::Column::LastAccessed])
      .value(
        progress::Column::CompletedAt,
        Expr::cust(
          r#"COALESCE("course_progress"."completed_at", "excluded"."completed_at")"#,
        ),
      )
      .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

  Ok(())
}

/// Single source of truth for `Enrollment.completed`: every lesson of the
/// course has a completed row scoped to this enrollment.
pub(crate) async fn recompute<C>(
  db: &C,
  enrollment_id: i64,
) -> Result<enrollment::Model>
where
  C: ConnectionTrait,
{
  let enrollment = enrollment::Entity::find_by_id(enrollment_id)
    .lock_exclusive()
    .one(db)
    .await?
    .ok_or(Error::NotFound("Enrollment"))?;

  let total = lesson_count(db, enrollment.course_id).await?;
  let done = completed_count(db, &enrollment).await?;
  let completed = total > 0 && done == total;

  if completed == enrollment.completed {
    return Ok(enrollment);
  }

  if completed {
    info!("Enrollment {} completed course {}", enrollment.id, enrollment.course_id);
  }

  Ok(
    enrollment::ActiveModel {
      completed: Set(completed),
      completed_at: Set(completed.then(utils::now)),
      ..enrollment.into()
    }
    .update(db)
    .await?,
  )
}

pub(crate) async fn recompute_course<C>(db: &C, course_id: i64) -> Result<()>
where
  C: ConnectionTrait,
{
  let ids: Vec<i64> = enrollment::Entity::find()
    .select_only()
    .column(enrollment::Column::Id)
    .filter(enrollment::Column::CourseId.eq(course_id))
    .into_tuple()
    .all(db)
    .await?;

  for id in ids {
    recompute(db, id).await?;
  }
  Ok(())
}

pub struct Progress<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Progress<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  async fn enrollment_for(
    &self,
    user: &user::Model,
    lesson: &lesson::Model,
  ) -> Result<enrollment::Model> {
    let course = lesson.owning_course(self.db).await?;

    enrollment::Entity::find()
      .filter(enrollment::Column::UserId.eq(user.id))
      .filter(enrollment::Column::CourseId.eq(course.id))
      .one(self.db)
      .await?
      .ok_or(Error::NotEnrolled)
  }

  async fn row<C>(
    db: &C,
    enrollment_id: i64,
    lesson_id: i64,
  ) -> Result<Option<progress::Model>>
  where
    C: ConnectionTrait,
  {
    Ok(
      progress::Entity::find()
        .filter(progress::Column::EnrollmentId.eq(enrollment_id))
        .filter(progress::Column::LessonId.eq(lesson_id))
        .one(db)
        .await?,
    )
  }

  pub async fn mark_lesson_complete(
    &self,
    user: &user::Model,
    lesson: &lesson::Model,
  ) -> Result<progress::Model> {
    let enrollment = self.enrollment_for(user, lesson).await?;

    let txn = self.db.begin().await?;
    complete_lesson(&txn, enrollment.id, lesson.id).await?;
    recompute(&txn, enrollment.id).await?;
    let row = Self::row(&txn, enrollment.id, lesson.id)
      .await?
      .ok_or(Error::Internal("progress row vanished after upsert".into()))?;
    txn.commit().await?;

    debug!("User {} completed lesson {}", user.id, lesson.id);
    Ok(row)
  }

  /// Returns `None` when the lesson was never touched.
  pub async fn mark_lesson_incomplete(
    &self,
    user: &user::Model,
    lesson: &lesson::Model,
  ) -> Result<Option<progress::Model>> {
    let enrollment = self.enrollment_for(user, lesson).await?;

    let txn = self.db.begin().await?;
    progress::Entity::update_many()
      .col_expr(progress::Column::Completed, Expr::value(false))
      .col_expr(progress::Column::CompletedAt, Expr::value(Option::<DateTime>::None))
      .col_expr(progress::Column::LastAccessed, Expr::value(utils::now()))
      .filter(progress::Column::EnrollmentId.eq(enrollment.id))
      .filter(progress::Column::LessonId.eq(lesson.id))
      .exec(&txn)
      .await?;

    recompute(&txn, enrollment.id).await?;
    let row = Self::row(&txn, enrollment.id, lesson.id).await?;
    txn.commit().await?;

    Ok(row)
  }

  /// Records time spent on a lesson, creating the row on first touch.
  pub async fn touch(
    &self,
    user: &user::Model,
    lesson: &lesson::Model,
    time_spent: i64,
  ) -> Result<progress::Model> {
    if time_spent < 0 {
      return Err(Error::Validation("time_spent cannot be negative".into()));
    }

    let enrollment = self.enrollment_for(user, lesson).await?;
    let now = utils::now();
    let row = progress::ActiveModel {
      id: NotSet,
      enrollment_id: Set(enrollment.id),
      lesson_id: Set(lesson.id),
      completed: Set(false),
      completed_at: Set(None),
      time_spent: Set(time_spent),
      last_accessed: Set(now),
    };

    let txn = self.db.begin().await?;
    progress::Entity::insert(row)
      .on_conflict(
        OnConflict::columns([
          progress::Column::EnrollmentId,
          progress::Column::LessonId,
        ])
        .update_column(progress::Column::LastAccessed)
        .value(
          progress::Column::TimeSpent,
          Expr::cust(
            r#""course_progress"."time_spent" + "excluded"."time_spent""#,
          ),
        )
        .to_owned(),
      )
      .exec_without_returning(&txn)
      .await?;

    let row = Self::row(&txn, enrollment.id, lesson.id)
      .await?
      .ok_or(Error::Internal("progress row vanished after upsert".into()))?;
    txn.commit().await?;

    Ok(row)
  }

  pub async fn course_completion(
    &self,
    enrollment: &enrollment::Model,
  ) -> Result<Completion> {
    let course = course::Entity::find_by_id(enrollment.course_id)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound("Course"))?;

    let mut modules = module::Entity::find()
      .filter(module::Column::CourseId.eq(course.id))
      .order_by_asc(module::Column::Order)
      .find_with_related(lesson::Entity)
      .all(self.db)
      .await?;
    modules.sort_by_key(|(module, _)| module.order);

    let done: HashSet<i64> = progress::Entity::find()
      .select_only()
      .column(progress::Column::LessonId)
      .filter(progress::Column::EnrollmentId.eq(enrollment.id))
      .filter(progress::Column::Completed.eq(true))
      .into_tuple::<i64>()
      .all(self.db)
      .await?
      .into_iter()
      .collect();

    let breakdown: Vec<ModuleCompletion> = modules
      .iter()
      .map(|(module, lessons)| {
        let total = lessons.len() as u64;
        let completed =
          lessons.iter().filter(|l| done.contains(&l.id)).count() as u64;
        ModuleCompletion {
          module_id: module.id,
          module_title: module.title.clone(),
          total_lessons: total,
          completed_lessons: completed,
          percentage: utils::percentage(completed, total),
        }
      })
      .collect();

    let total: u64 = breakdown.iter().map(|m| m.total_lessons).sum();
    let completed: u64 = breakdown.iter().map(|m| m.completed_lessons).sum();

    Ok(Completion {
      enrollment_id: enrollment.id,
      course_id: course.id,
      course_title: course.title,
      total_lessons: total,
      completed_lessons: completed,
      percentage: utils::percentage(completed, total),
      completed: enrollment.completed,
      module_breakdown: breakdown,
    })
  }

  pub async fn summaries(&self, user: &user::Model) -> Result<Vec<Summary>> {
    let enrollments = enrollment::Entity::find()
      .filter(enrollment::Column::UserId.eq(user.id))
      .order_by_asc(enrollment::Column::EnrolledAt)
      .find_also_related(course::Entity)
      .all(self.db)
      .await?;

    let mut out = Vec::with_capacity(enrollments.len());
    for (enrollment, course) in enrollments {
      let Some(course) = course else { continue };
      let total = lesson_count(self.db, course.id).await?;
      let done = completed_count(self.db, &enrollment).await?;

      out.push(Summary {
        enrollment_id: enrollment.id,
        course_id: course.id,
        course_title: course.title,
        total_lessons: total,
        completed_lessons: done,
        percentage: utils::percentage(done, total),
        completed: enrollment.completed,
      });
    }

    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::{PaymentStatus, Role},
    sv::testing,
  };

  struct Fixture {
    db: DatabaseConnection,
    student: user::Model,
    course: course::Model,
    lessons: Vec<lesson::Model>,
  }

  async fn fixture(lessons: i32) -> Fixture {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let student = testing::user(&db, "student", Role::Student).await;
    let course = testing::course(&db, &owner, "Course", 0).await;
    let module = testing::module(&db, &course, 1).await;

    let mut out = Vec::new();
    for order in 1..=lessons {
      out.push(testing::lesson(&db, &module, order).await);
    }
    testing::enrollment(&db, &student, &course, PaymentStatus::Free).await;

    Fixture { db, student, course, lessons: out }
  }

  #[tokio::test]
  async fn test_completion_flips_both_ways() {
    let f = fixture(2).await;
    let sv = Progress::new(&f.db);

    sv.mark_lesson_complete(&f.student, &f.lessons[0]).await.unwrap();
    let enrollment = testing::refetch_enrollment(&f.db, &f.student, &f.course).await;
    assert!(!enrollment.completed);

    sv.mark_lesson_complete(&f.student, &f.lessons[1]).await.unwrap();
    let enrollment = testing::refetch_enrollment(&f.db, &f.student, &f.course).await;
    assert!(enrollment.completed);
    assert!(enrollment.completed_at.is_some());

    let row = sv.mark_lesson_incomplete(&f.student, &f.lessons[0]).await.unwrap();
    let row = row.unwrap();
    assert!(!row.completed);
    assert!(row.completed_at.is_none());

    let enrollment = testing::refetch_enrollment(&f.db, &f.student, &f.course).await;
    assert!(!enrollment.completed);
    assert!(enrollment.completed_at.is_none());
  }

  #[tokio::test]
  async fn test_recomplete_keeps_timestamp() {
    let f = fixture(2).await;
    let sv = Progress::new(&f.db);

    let first = sv.mark_lesson_complete(&f.student, &f.lessons[0]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = sv.mark_lesson_complete(&f.student, &f.lessons[0]).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.completed_at, second.completed_at);
    assert!(second.last_accessed >= first.last_accessed);
  }

  #[tokio::test]
  async fn test_incomplete_without_row_is_benign() {
    let f = fixture(1).await;
    let sv = Progress::new(&f.db);

    let row = sv.mark_lesson_incomplete(&f.student, &f.lessons[0]).await.unwrap();
    assert!(row.is_none());
  }

  #[tokio::test]
  async fn test_requires_enrollment() {
    let f = fixture(1).await;
    let stranger = testing::user(&f.db, "stranger", Role::Student).await;
    let sv = Progress::new(&f.db);

    assert!(matches!(
      sv.mark_lesson_complete(&stranger, &f.lessons[0]).await,
      Err(Error::NotEnrolled)
    ));
    assert!(matches!(
      sv.mark_lesson_incomplete(&stranger, &f.lessons[0]).await,
      Err(Error::NotEnrolled)
    ));
  }

  #[tokio::test]
  async fn test_zero_lesson_course() {
    let f = fixture(0).await;
    let enrollment = testing::refetch_enrollment(&f.db, &f.student, &f.course).await;

    let completion =
      Progress::new(&f.db).course_completion(&enrollment).await.unwrap();

    assert_eq!(completion.total_lessons, 0);
    assert_eq!(completion.percentage, 0);
    assert!(!completion.completed);
    assert_eq!(completion.module_breakdown.len(), 1);
    assert_eq!(completion.module_breakdown[0].percentage, 0);
  }

  #[tokio::test]
  async fn test_module_breakdown() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let student = testing::user(&db, "student", Role::Student).await;
    let course = testing::course(&db, &owner, "Split", 0).await;
    let m1 = testing::module(&db, &course, 1).await;
    let m2 = testing::module(&db, &course, 2).await;
    let a = testing::lesson(&db, &m1, 1).await;
    testing::lesson(&db, &m1, 2).await;
    testing::lesson(&db, &m1, 3).await;
    testing::lesson(&db, &m2, 1).await;
    let enrollment =
      testing::enrollment(&db, &student, &course, PaymentStatus::Free).await;

    let sv = Progress::new(&db);
    sv.mark_lesson_complete(&student, &a).await.unwrap();

    let completion = sv.course_completion(&enrollment).await.unwrap();
    assert_eq!(completion.total_lessons, 4);
    assert_eq!(completion.completed_lessons, 1);
    assert_eq!(completion.percentage, 25);
    assert_eq!(completion.module_breakdown[0].module_id, m1.id);
    assert_eq!(completion.module_breakdown[0].percentage, 33);
    assert_eq!(completion.module_breakdown[1].percentage, 0);
  }

  #[tokio::test]
  async fn test_touch_accumulates_time() {
    let f = fixture(1).await;
    let sv = Progress::new(&f.db);

    sv.touch(&f.student, &f.lessons[0], 30).await.unwrap();
    let row = sv.touch(&f.student, &f.lessons[0], 45).await.unwrap();

    assert_eq!(row.time_spent, 75);
    assert!(!row.completed);

    let row = sv.mark_lesson_complete(&f.student, &f.lessons[0]).await.unwrap();
    assert_eq!(row.time_spent, 75);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_completions_finish_enrollment() {
    let (_dir, db) = testing::file_db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let student = testing::user(&db, "student", Role::Student).await;
    let course = testing::course(&db, &owner, "Race", 0).await;
    let module = testing::module(&db, &course, 1).await;

    let mut lessons = Vec::new();
    for order in 1..=6 {
      lessons.push(testing::lesson(&db, &module, order).await);
    }
    testing::enrollment(&db, &student, &course, PaymentStatus::Free).await;

    let tasks: Vec<_> = lessons
      .into_iter()
      .map(|lesson| {
        let db = db.clone();
        let student = student.clone();
        tokio::spawn(async move {
          Progress::new(&db).mark_lesson_complete(&student, &lesson).await
        })
      })
      .collect();

    for task in tasks {
      task.await.unwrap().unwrap();
    }

    let enrollment = testing::refetch_enrollment(&db, &student, &course).await;
    assert!(enrollment.completed);
    assert!(enrollment.completed_at.is_some());
  }

  #[tokio::test]
  async fn test_summaries() {
    let f = fixture(2).await;
    let sv = Progress::new(&f.db);
    sv.mark_lesson_complete(&f.student, &f.lessons[0]).await.unwrap();

    let summaries = sv.summaries(&f.student).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].completed_lessons, 1);
    assert_eq!(summaries[0].percentage, 50);
  }
}
