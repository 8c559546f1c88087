use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize};

use super::Auth;
use crate::{
  entity::{CourseStatus, category, course, lesson, material, module},
  prelude::*,
  state::AppState,
  sv::{
    OwnsCourse,
    catalog::{CoursePatch, NewCourse, NewLesson},
  },
};

/// Course as rendered to clients, money as two-decimal strings.
#[derive(Debug, Serialize)]
pub struct CourseView {
  pub id: i64,
  pub title: String,
  pub slug: String,
  pub description: String,
  pub price: String,
  pub current_price: String,
  pub is_paid: bool,
  pub has_discount: bool,
  pub discount_price: Option<String>,
  pub discount_expiry: Option<DateTime>,
  pub status: CourseStatus,
  pub is_public: bool,
  pub allow_enrollment: bool,
  pub is_available: bool,
  pub max_students: i32,
  pub student_count: i32,
  pub duration_hours: Option<i32>,
  pub instructor_id: i64,
  pub category_id: Option<i64>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl From<course::Model> for CourseView {
  fn from(course: course::Model) -> Self {
    Self {
      current_price: utils::format_price(course.current_price(utils::now())),
      is_available: course.is_available(),
      price: utils::format_price(course.price),
      discount_price: course.discount_price.map(utils::format_price),
      id: course.id,
      title: course.title,
      slug: course.slug,
      description: course.description,
      is_paid: course.is_paid,
      has_discount: course.has_discount,
      discount_expiry: course.discount_expiry,
      status: course.status,
      is_public: course.is_public,
      allow_enrollment: course.allow_enrollment,
      max_students: course.max_students,
      student_count: course.student_count,
      duration_hours: course.duration_hours,
      instructor_id: course.instructor_id,
      category_id: course.category_id,
      created_at: course.created_at,
      updated_at: course.updated_at,
    }
  }
}

fn views(courses: Vec<course::Model>) -> Json<Vec<CourseView>> {
  Json(courses.into_iter().map(CourseView::from).collect())
}

/// Distinguishes an explicit `null` from an absent field.
fn nullable<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}

fn price(raw: Option<&str>) -> Result<Option<i64>> {
  raw.map(utils::parse_price).transpose()
}

fn yes() -> bool {
  true
}

#[derive(Debug, Deserialize)]
pub struct CategoryReq {
  pub name: String,
  pub description: Option<String>,
}

pub async fn categories(
  State(app): State<Arc<AppState>>,
) -> Result<Json<Vec<category::Model>>> {
  Ok(Json(app.sv().catalog.categories().await?))
}

pub async fn create_category(
  State(app): State<Arc<AppState>>,
  Auth { user, .. }: Auth,
  Json(req): Json<CategoryReq>,
) -> Result<(StatusCode, Json<category::Model>)> {
  let sv = app.sv();
  sv.user.require(&user, "manage_categories").await?;

  let category = sv.catalog.create_category(&req.name, req.description).await?;
  Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize)]
pub struct CourseReq {
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub price: Option<String>,
  #[serde(default)]
  pub has_discount: bool,
  pub discount_price: Option<String>,
  pub discount_expiry: Option<DateTime>,
  #[serde(default)]
  pub status: CourseStatus,
  #[serde(default = "yes")]
  pub is_public: bool,
  #[serde(default = "yes")]
  pub allow_enrollment: bool,
  #[serde(default)]
  pub max_students: i32,
  pub duration_hours: Option<i32>,
  pub category_id: Option<i64>,
}

impl CourseReq {
  fn into_new(self) -> Result<NewCourse> {
    Ok(NewCourse {
      price: price(self.price.as_deref())?.unwrap_or(0),
      discount_price: price(self.discount_price.as_deref())?,
      title: self.title,
      description: self.description,
      has_discount: self.has_discount,
      discount_expiry: self.discount_expiry,
      status: self.status,
      is_public: self.is_public,
      allow_enrollment: self.allow_enrollment,
      max_students: self.max_students,
      duration_hours: self.duration_hours,
      category_id: self.category_id,
    })
  }
}

#[derive(Debug, Deserialize)]
pub struct CoursePatchReq {
  pub title: Option<String>,
  pub description: Option<String>,
  pub price: Option<String>,
  pub has_discount: Option<bool>,
  #[serde(default, deserialize_with = "nullable")]
  pub discount_price: Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable")]
  pub discount_expiry: Option<Option<DateTime>>,
  pub status: Option<CourseStatus>,
  pub is_public: Option<bool>,
  pub allow_enrollment: Option<bool>,
  pub max_students: Option<i32>,
  #[serde(default, deserialize_with = "nullable")]
  pub duration_hours: Option<Option<i32>>,
  #[serde(default, deserialize_with = "nullable")]
  pub category_id: Option<Option<i64>>,
}

impl CoursePatchReq {
  fn into_patch(self) -> Result<CoursePatch> {
    let discount_price = match self.discount_price {
      Some(raw) => Some(price(raw.as_deref())?),
      None => None,
    };

    Ok(CoursePatch {
      price: price(self.price.as_deref())?,
      discount_price,
      title: self.title,
      description: self.description,
      has_discount: self.has_discount,
      discount_expiry: self.discount_expiry,
      status: self.status,
      is_public: self.is_public,
      allow_enrollment: self.allow_enrollment,
      max_students: self.max_students,
      duration_hours: self.duration_hours,
      category_id: self.category_id,
    })
  }
}

pub async fn list(
  State(app): State<Arc<AppState>>,
) -> Result<Json<Vec<CourseView>>> {
  Ok(views(app.sv().catalog.listed_courses().await?))
}

pub async fn mine(
  State(app): State<Arc<AppState>>,
  Auth { user, .. }: Auth,
) -> Result<Json<Vec<CourseView>>> {
  Ok(views(app.sv().catalog.enrolled_courses(&user).await?))
}

pub async fn teaching(
  State(app): State<Arc<AppState>>,
  Auth { user, .. }: Auth,
) -> Result<Json<Vec<CourseView>>> {
  if !user.is_instructor() && !user.is_admin() {
    return Err(Error::Forbidden);
  }
  Ok(views(app.sv().catalog.teaching_courses(&user).await?))
}

pub async fn detail(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  auth: Option<Auth>,
) -> Result<Json<CourseView>> {
  let viewer = auth.map(|auth| auth.user);
  let course = app.sv().catalog.visible_course(id, viewer.as_ref()).await?;
  Ok(Json(course.into()))
}

pub async fn create(
  State(app): State<Arc<AppState>>,
  Auth { user, .. }: Auth,
  Json(req): Json<CourseReq>,
) -> Result<(StatusCode, Json<CourseView>)> {
  let sv = app.sv();
  sv.user.require(&user, "add_course").await?;

  let course = sv.catalog.create_course(&user, req.into_new()?).await?;
  Ok((StatusCode::CREATED, Json(course.into())))
}

pub async fn update(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
  Json(req): Json<CoursePatchReq>,
) -> Result<Json<CourseView>> {
  let sv = app.sv();
  sv.user.require(&user, "change_course").await?;

  let course = sv.catalog.course(id).await?.managed_by(&app.db, &user).await?;
  let course = sv.catalog.update_course(course, req.into_patch()?).await?;
  Ok(Json(course.into()))
}

pub async fn delete(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<StatusCode> {
  let sv = app.sv();
  sv.user.require(&user, "delete_course").await?;

  let course = sv.catalog.course(id).await?.managed_by(&app.db, &user).await?;
  sv.catalog.delete_course(course).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ModuleReq {
  pub title: String,
  pub description: Option<String>,
  pub order: i32,
}

pub async fn modules(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  auth: Option<Auth>,
) -> Result<Json<Vec<module::Model>>> {
  let viewer = auth.map(|auth| auth.user);
  let sv = app.sv();

  let course = sv.catalog.visible_course(id, viewer.as_ref()).await?;
  Ok(Json(sv.catalog.modules(course.id).await?))
}

pub async fn create_module(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
  Json(req): Json<ModuleReq>,
) -> Result<(StatusCode, Json<module::Model>)> {
  let sv = app.sv();
  sv.user.require(&user, "change_course").await?;

  let course = sv.catalog.course(id).await?.managed_by(&app.db, &user).await?;
  let module = sv
    .catalog
    .create_module(&course, &req.title, req.description, req.order)
    .await?;
  Ok((StatusCode::CREATED, Json(module)))
}

#[derive(Debug, Deserialize)]
pub struct LessonReq {
  pub title: String,
  #[serde(default)]
  pub content: String,
  pub order: i32,
  pub duration: Option<i32>,
  #[serde(default)]
  pub is_preview: bool,
  pub video_file: Option<String>,
  pub video_url: Option<String>,
}

pub async fn lessons(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<Vec<lesson::Model>>> {
  let sv = app.sv();
  let module = sv.catalog.module(id).await?;
  let course = module.owning_course(&app.db).await?;
  sv.access.require_content(&user, &course).await?;

  Ok(Json(sv.catalog.lessons(module.id).await?))
}

pub async fn create_lesson(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
  Json(req): Json<LessonReq>,
) -> Result<(StatusCode, Json<lesson::Model>)> {
  let sv = app.sv();
  sv.user.require(&user, "change_course").await?;

  let module = sv.catalog.module(id).await?;
  module.managed_by(&app.db, &user).await?;

  let lesson = sv
    .catalog
    .create_lesson(
      &module,
      NewLesson {
        title: req.title,
        content: req.content,
        order: req.order,
        duration: req.duration,
        is_preview: req.is_preview,
        video_file: req.video_file,
        video_url: req.video_url,
      },
    )
    .await?;
  Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn lesson(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<lesson::Model>> {
  let sv = app.sv();
  let lesson = sv.catalog.lesson(id).await?;
  let course = lesson.owning_course(&app.db).await?;
  sv.access.require_content(&user, &course).await?;

  Ok(Json(lesson))
}

pub async fn delete_lesson(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<StatusCode> {
  let sv = app.sv();
  sv.user.require(&user, "change_course").await?;

  let lesson = sv.catalog.lesson(id).await?;
  lesson.managed_by(&app.db, &user).await?;
  sv.catalog.delete_lesson(lesson).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ReorderReq {
  pub order: i32,
}

pub async fn reorder_lesson(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
  Json(req): Json<ReorderReq>,
) -> Result<Json<lesson::Model>> {
  let sv = app.sv();
  sv.user.require(&user, "change_course").await?;

  let lesson = sv.catalog.lesson(id).await?;
  lesson.managed_by(&app.db, &user).await?;
  Ok(Json(sv.catalog.reorder_lesson(lesson, req.order).await?))
}

#[derive(Debug, Deserialize)]
pub struct MaterialReq {
  pub title: String,
  pub description: Option<String>,
  /// Relative to the media root
  pub file_path: String,
}

pub async fn materials(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<Vec<material::Model>>> {
  let sv = app.sv();
  let lesson = sv.catalog.lesson(id).await?;
  let course = lesson.owning_course(&app.db).await?;
  sv.access.require_content(&user, &course).await?;

  Ok(Json(sv.catalog.materials(lesson.id).await?))
}

pub async fn create_material(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
  Json(req): Json<MaterialReq>,
) -> Result<(StatusCode, Json<material::Model>)> {
  let sv = app.sv();
  sv.user.require(&user, "change_course").await?;

  let lesson = sv.catalog.lesson(id).await?;
  lesson.managed_by(&app.db, &user).await?;

  let material = sv
    .catalog
    .create_material(&lesson, &req.title, req.description, &req.file_path)
    .await?;
  Ok((StatusCode::CREATED, Json(material)))
}
