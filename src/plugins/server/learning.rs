use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{Auth, courses::CourseView};
use crate::{
  entity::{PaymentStatus, enrollment, progress},
  prelude::*,
  state::AppState,
  sv::{
    access::AccessCheck,
    catalog::ModuleTree,
    enrollment::Enrolled,
    progress::{Completion, Summary},
  },
};

#[derive(Debug, Serialize)]
pub struct EnrollmentView {
  pub id: i64,
  pub user_id: i64,
  pub course_id: i64,
  pub enrolled_at: DateTime,
  pub payment_status: PaymentStatus,
  pub amount_paid: String,
  pub completed: bool,
  pub completed_at: Option<DateTime>,
}

impl From<enrollment::Model> for EnrollmentView {
  fn from(enrollment: enrollment::Model) -> Self {
    Self {
      amount_paid: utils::format_price(enrollment.amount_paid),
      id: enrollment.id,
      user_id: enrollment.user_id,
      course_id: enrollment.course_id,
      enrolled_at: enrollment.enrolled_at,
      payment_status: enrollment.payment_status,
      completed: enrollment.completed,
      completed_at: enrollment.completed_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct PaymentRequired {
  pub enrollment_id: i64,
  pub price: String,
  pub payment_status: PaymentStatus,
  pub message: &'static str,
}

pub async fn enroll(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Response> {
  let sv = app.sv();
  sv.user.require(&user, "enroll_course").await?;

  let course = sv.catalog.visible_course(id, Some(&user)).await?;

  Ok(match sv.enrollment.enroll(&user, course.id).await? {
    Enrolled::Granted(enrollment) => {
      (StatusCode::CREATED, Json(EnrollmentView::from(enrollment))).into_response()
    }
    Enrolled::PaymentRequired { enrollment, price } => Json(PaymentRequired {
      enrollment_id: enrollment.id,
      price: utils::format_price(price),
      payment_status: enrollment.payment_status,
      message: "Payment is required to access this course",
    })
    .into_response(),
  })
}

pub async fn check_access(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<AccessCheck>> {
  let sv = app.sv();
  let course = sv.catalog.visible_course(id, Some(&user)).await?;
  Ok(Json(sv.access.check(&user, &course).await?))
}

#[derive(Debug, Serialize)]
pub struct Content {
  pub course: CourseView,
  pub modules: Vec<ModuleTree>,
}

pub async fn content(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<Content>> {
  let sv = app.sv();
  let course = sv.catalog.visible_course(id, Some(&user)).await?;
  sv.access.require_content(&user, &course).await?;

  let modules = sv.catalog.content(&course).await?;
  Ok(Json(Content { course: course.into(), modules }))
}

pub async fn complete_lesson(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<progress::Model>> {
  let sv = app.sv();
  let lesson = sv.catalog.lesson(id).await?;
  Ok(Json(sv.progress.mark_lesson_complete(&user, &lesson).await?))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Incomplete {
  Row(progress::Model),
  Untouched { lesson_id: i64, completed: bool },
}

pub async fn mark_incomplete(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<Incomplete>> {
  let sv = app.sv();
  let lesson = sv.catalog.lesson(id).await?;

  let res = match sv.progress.mark_lesson_incomplete(&user, &lesson).await? {
    Some(row) => Incomplete::Row(row),
    None => Incomplete::Untouched { lesson_id: lesson.id, completed: false },
  };
  Ok(Json(res))
}

#[derive(Debug, Deserialize)]
pub struct TouchReq {
  #[serde(default)]
  pub time_spent: i64,
}

pub async fn touch(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
  Json(req): Json<TouchReq>,
) -> Result<Json<progress::Model>> {
  let sv = app.sv();
  let lesson = sv.catalog.lesson(id).await?;
  Ok(Json(sv.progress.touch(&user, &lesson, req.time_spent).await?))
}

pub async fn course_progress(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<Completion>> {
  let sv = app.sv();
  let course = sv.catalog.course(id).await?;
  let enrollment =
    sv.enrollment.for_user(user.id, course.id).await?.ok_or(Error::NotEnrolled)?;

  Ok(Json(sv.progress.course_completion(&enrollment).await?))
}

pub async fn enrollment_progress(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<Completion>> {
  let sv = app.sv();
  let enrollment = sv.enrollment.visible(&user, id).await?;
  Ok(Json(sv.progress.course_completion(&enrollment).await?))
}

pub async fn summaries(
  State(app): State<Arc<AppState>>,
  Auth { user, .. }: Auth,
) -> Result<Json<Vec<Summary>>> {
  Ok(Json(app.sv().progress.summaries(&user).await?))
}

pub async fn enrollments(
  State(app): State<Arc<AppState>>,
  Auth { user, .. }: Auth,
) -> Result<Json<Vec<EnrollmentView>>> {
  let list = app.sv().enrollment.list(&user).await?;
  Ok(Json(list.into_iter().map(EnrollmentView::from).collect()))
}

pub async fn enrollment(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<EnrollmentView>> {
  Ok(Json(app.sv().enrollment.visible(&user, id).await?.into()))
}

pub async fn confirm_payment(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<EnrollmentView>> {
  let sv = app.sv();
  sv.user.require(&user, "manage_payments").await?;
  Ok(Json(sv.enrollment.confirm_payment(id).await?.into()))
}

pub async fn fail_payment(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<EnrollmentView>> {
  let sv = app.sv();
  sv.user.require(&user, "manage_payments").await?;
  Ok(Json(sv.enrollment.fail_payment(id).await?.into()))
}

pub async fn refund(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<EnrollmentView>> {
  let sv = app.sv();
  sv.user.require(&user, "manage_payments").await?;
  Ok(Json(sv.enrollment.refund(id).await?.into()))
}

pub async fn complete_enrollment(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<EnrollmentView>> {
  let sv = app.sv();
  sv.user.require(&user, "complete_enrollment").await?;
  Ok(Json(sv.enrollment.mark_course_complete(&user, id).await?.into()))
}

#[derive(Debug, Deserialize)]
pub struct CompleteForReq {
  pub user_id: i64,
}

pub async fn complete_for_student(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
  Json(req): Json<CompleteForReq>,
) -> Result<Json<EnrollmentView>> {
  let sv = app.sv();
  sv.user.require(&user, "complete_enrollment").await?;

  let course = sv.catalog.course(id).await?;
  let student = sv.user.by_id(req.user_id).await?.ok_or(Error::NotFound("User"))?;
  let enrollment = sv
    .enrollment
    .for_user(student.id, course.id)
    .await?
    .ok_or(Error::NotFound("Enrollment"))?;

  Ok(Json(sv.enrollment.mark_course_complete(&user, enrollment.id).await?.into()))
}
