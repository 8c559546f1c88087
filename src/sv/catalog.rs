use sea_orm::JoinType;
use serde::Serialize;

use crate::{
  entity::{
    CourseStatus, category, course, enrollment, lesson, material, module, user,
  },
  prelude::*,
  sv::progress,
};

#[derive(Debug, Clone)]
pub struct NewCourse {
  pub title: String,
  pub description: String,
  pub price: i64,
  pub has_discount: bool,
  pub discount_price: Option<i64>,
  pub discount_expiry: Option<DateTime>,
  pub status: CourseStatus,
  pub is_public: bool,
  pub allow_enrollment: bool,
  pub max_students: i32,
  pub duration_hours: Option<i32>,
  pub category_id: Option<i64>,
}

impl NewCourse {
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Validation("Title is required".into()));
    }
    course::check_fields(
      self.price,
      self.has_discount,
      self.discount_price,
      self.max_students,
    )
    .map_err(|msg| Error::Validation(msg.into()))
  }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
  pub title: Option<String>,
  pub description: Option<String>,
  pub price: Option<i64>,
  pub has_discount: Option<bool>,
  pub discount_price: Option<Option<i64>>,
  pub discount_expiry: Option<Option<DateTime>>,
  pub status: Option<CourseStatus>,
  pub is_public: Option<bool>,
  pub allow_enrollment: Option<bool>,
  pub max_students: Option<i32>,
  pub duration_hours: Option<Option<i32>>,
  pub category_id: Option<Option<i64>>,
}

#[derive(Debug, Clone)]
pub struct NewLesson {
  pub title: String,
  pub content: String,
  pub order: i32,
  pub duration: Option<i32>,
  pub is_preview: bool,
  pub video_file: Option<String>,
  pub video_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LessonTree {
  #[serde(flatten)]
  pub lesson: lesson::Model,
  pub video_source: Option<lesson::VideoSource>,
  pub materials: Vec<material::Model>,
}

#[derive(Debug, Serialize)]
pub struct ModuleTree {
  #[serde(flatten)]
  pub module: module::Model,
  pub lessons: Vec<LessonTree>,
}

pub struct Catalog<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Catalog<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create_category(
    &self,
    name: &str,
    description: Option<String>,
  ) -> Result<category::Model> {
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::Validation("Category name is required".into()));
    }

    category::ActiveModel {
      id: NotSet,
      name: Set(name.to_string()),
      description: Set(description),
      created_at: Set(utils::now()),
    }
    .insert(self.db)
    .await
    .map_err(|err| {
      Error::on_unique(err, Error::Validation("Category already exists".into()))
    })
  }

  pub async fn categories(&self) -> Result<Vec<category::Model>> {
    Ok(
      category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(self.db)
        .await?,
    )
  }

  /// First free slug among `base`, `base-1`, `base-2`, ...
  async fn unique_slug<C>(db: &C, title: &str) -> Result<String>
  where
    C: ConnectionTrait,
  {
    let base = utils::slugify(title);
    let mut candidate = base.clone();
    let mut suffix = 0;

    loop {
      let taken = course::Entity::find()
        .filter(course::Column::Slug.eq(candidate.as_str()))
        .count(db)
        .await?;
      if taken == 0 {
        return Ok(candidate);
      }
      suffix += 1;
      candidate = format!("{base}-{suffix}");
    }
  }

  pub async fn create_course(
    &self,
    instructor: &user::Model,
    new: NewCourse,
  ) -> Result<course::Model> {
    new.validate()?;

    let txn = self.db.begin().await?;
    let slug = Self::unique_slug(&txn, &new.title).await?;
    let now = utils::now();

    let course = course::ActiveModel {
      id: NotSet,
      title: Set(new.title.trim().to_string()),
      slug: Set(slug),
      description: Set(new.description),
      price: Set(new.price),
      is_paid: Set(new.price > 0),
      has_discount: Set(new.has_discount),
      discount_price: Set(new.discount_price),
      discount_expiry: Set(new.discount_expiry),
      status: Set(new.status),
      is_public: Set(new.is_public),
      allow_enrollment: Set(new.allow_enrollment),
      max_students: Set(new.max_students),
      student_count: Set(0),
      duration_hours: Set(new.duration_hours),
      instructor_id: Set(instructor.id),
      category_id: Set(new.category_id),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|err| {
      Error::on_unique(err, Error::Validation("Slug is already taken".into()))
    })?;

    txn.commit().await?;

    info!("Course `{}` created by user {}", course.slug, instructor.id);
    Ok(course)
  }

  pub async fn update_course(
    &self,
    course: course::Model,
    patch: CoursePatch,
  ) -> Result<course::Model> {
    let mut next = course.clone();
    if let Some(title) = patch.title {
      next.title = title.trim().to_string();
    }
    if let Some(description) = patch.description {
      next.description = description;
    }
    if let Some(price) = patch.price {
      next.price = price;
    }
    if let Some(has_discount) = patch.has_discount {
      next.has_discount = has_discount;
    }
    if let Some(discount_price) = patch.discount_price {
      next.discount_price = discount_price;
    }
    if let Some(discount_expiry) = patch.discount_expiry {
      next.discount_expiry = discount_expiry;
    }
    if let Some(status) = patch.status {
      next.status = status;
    }
    if let Some(is_public) = patch.is_public {
      next.is_public = is_public;
    }
    if let Some(allow_enrollment) = patch.allow_enrollment {
      next.allow_enrollment = allow_enrollment;
    }
    if let Some(max_students) = patch.max_students {
      next.max_students = max_students;
    }
    if let Some(duration_hours) = patch.duration_hours {
      next.duration_hours = duration_hours;
    }
    if let Some(category_id) = patch.category_id {
      next.category_id = category_id;
    }

    if next.title.is_empty() {
      return Err(Error::Validation("Title is required".into()));
    }
    course::check_fields(
      next.price,
      next.has_discount,
      next.discount_price,
      next.max_students,
    )
    .map_err(|msg| Error::Validation(msg.into()))?;

    let mut active: course::ActiveModel = course.into();
    active.title = Set(next.title);
    active.description = Set(next.description);
    active.price = Set(next.price);
    active.has_discount = Set(next.has_discount);
    active.discount_price = Set(next.discount_price);
    active.discount_expiry = Set(next.discount_expiry);
    active.status = Set(next.status);
    active.is_public = Set(next.is_public);
    active.allow_enrollment = Set(next.allow_enrollment);
    active.max_students = Set(next.max_students);
    active.duration_hours = Set(next.duration_hours);
    active.category_id = Set(next.category_id);

    Ok(active.update(self.db).await?)
  }

  pub async fn delete_course(&self, course: course::Model) -> Result<()> {
    info!("Deleting course `{}`", course.slug);
    course.delete(self.db).await?;
    Ok(())
  }

  pub async fn course(&self, id: i64) -> Result<course::Model> {
    course::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound("Course"))
  }

  /// Published public courses, plus any the viewer owns or administers.
  pub async fn visible_course(
    &self,
    id: i64,
    viewer: Option<&user::Model>,
  ) -> Result<course::Model> {
    let course = self.course(id).await?;
    let privileged =
      viewer.is_some_and(|u| u.is_admin() || u.id == course.instructor_id);

    if course.is_listed() || privileged {
      Ok(course)
    } else {
      Err(Error::NotFound("Course"))
    }
  }

  pub async fn listed_courses(&self) -> Result<Vec<course::Model>> {
    Ok(
      course::Entity::find()
        .filter(course::Column::Status.eq(CourseStatus::Published))
        .filter(course::Column::IsPublic.eq(true))
        .order_by_desc(course::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }

  pub async fn enrolled_courses(
    &self,
    user: &user::Model,
  ) -> Result<Vec<course::Model>> {
    Ok(
      course::Entity::find()
        .join(JoinType::InnerJoin, course::Relation::Enrollments.def())
        .filter(enrollment::Column::UserId.eq(user.id))
        .order_by_asc(enrollment::Column::EnrolledAt)
        .all(self.db)
        .await?,
    )
  }

  pub async fn teaching_courses(
    &self,
    user: &user::Model,
  ) -> Result<Vec<course::Model>> {
    Ok(
      course::Entity::find()
        .filter(course::Column::InstructorId.eq(user.id))
        .order_by_desc(course::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }

  pub async fn create_module(
    &self,
    course: &course::Model,
    title: &str,
    description: Option<String>,
    order: i32,
  ) -> Result<module::Model> {
    module::ActiveModel {
      id: NotSet,
      course_id: Set(course.id),
      title: Set(title.trim().to_string()),
      description: Set(description),
      order: Set(order),
      created_at: Set(utils::now()),
    }
    .insert(self.db)
    .await
    .map_err(|err| {
      Error::on_unique(
        err,
        Error::Validation(format!("Module order {order} is already used")),
      )
    })
  }

  pub async fn module(&self, id: i64) -> Result<module::Model> {
    module::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound("Module"))
  }

  pub async fn modules(&self, course_id: i64) -> Result<Vec<module::Model>> {
    Ok(
      module::Entity::find()
        .filter(module::Column::CourseId.eq(course_id))
        .order_by_asc(module::Column::Order)
        .all(self.db)
        .await?,
    )
  }

  pub async fn create_lesson(
    &self,
    module: &module::Model,
    new: NewLesson,
  ) -> Result<lesson::Model> {
    if new.title.trim().is_empty() {
      return Err(Error::Validation("Title is required".into()));
    }

    let order = new.order;
    let txn = self.db.begin().await?;

    let lesson = lesson::ActiveModel {
      id: NotSet,
      module_id: Set(module.id),
      title: Set(new.title.trim().to_string()),
      content: Set(new.content),
      order: Set(order),
      duration: Set(new.duration),
      is_preview: Set(new.is_preview),
      video_file: Set(new.video_file),
      video_url: Set(new.video_url),
      created_at: Set(utils::now()),
    }
    .insert(&txn)
    .await
    .map_err(|err| {
      Error::on_unique(
        err,
        Error::Validation(format!("Lesson order {order} is already used")),
      )
    })?;

    // a new lesson reopens every finished enrollment of the course
    progress::recompute_course(&txn, module.course_id).await?;
    txn.commit().await?;

    Ok(lesson)
  }

  pub async fn delete_lesson(&self, lesson: lesson::Model) -> Result<()> {
    let txn = self.db.begin().await?;
    let course_id = module::Entity::find_by_id(lesson.module_id)
      .one(&txn)
      .await?
      .map(|module| module.course_id)
      .ok_or(Error::NotFound("Module"))?;

    lesson.delete(&txn).await?;
    progress::recompute_course(&txn, course_id).await?;

    txn.commit().await?;
    Ok(())
  }

  pub async fn reorder_lesson(
    &self,
    lesson: lesson::Model,
    order: i32,
  ) -> Result<lesson::Model> {
    lesson::ActiveModel { order: Set(order), ..lesson.into() }
      .update(self.db)
      .await
      .map_err(|err| {
        Error::on_unique(
          err,
          Error::Validation(format!("Lesson order {order} is already used")),
        )
      })
  }

  pub async fn lesson(&self, id: i64) -> Result<lesson::Model> {
    lesson::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound("Lesson"))
  }

  pub async fn lessons(&self, module_id: i64) -> Result<Vec<lesson::Model>> {
    Ok(
      lesson::Entity::find()
        .filter(lesson::Column::ModuleId.eq(module_id))
        .order_by_asc(lesson::Column::Order)
        .all(self.db)
        .await?,
    )
  }

  pub async fn create_material(
    &self,
    lesson: &lesson::Model,
    title: &str,
    description: Option<String>,
    file_path: &str,
  ) -> Result<material::Model> {
    if file_path.trim().is_empty() {
      return Err(Error::Validation("File path is required".into()));
    }

    Ok(
      material::ActiveModel {
        id: NotSet,
        lesson_id: Set(lesson.id),
        title: Set(title.trim().to_string()),
        description: Set(description),
        file_path: Set(file_path.trim().to_string()),
        created_at: Set(utils::now()),
      }
      .insert(self.db)
      .await?,
    )
  }

  pub async fn material(&self, id: i64) -> Result<material::Model> {
    material::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::NotFound("Material"))
  }

  pub async fn materials(&self, lesson_id: i64) -> Result<Vec<material::Model>> {
    Ok(
      material::Entity::find()
        .filter(material::Column::LessonId.eq(lesson_id))
        .order_by_asc(material::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  /// Ordered module -> lesson -> material tree of a course.
  pub async fn content(&self, course: &course::Model) -> Result<Vec<ModuleTree>> {
    let modules = self.modules(course.id).await?;
    let module_ids: Vec<i64> = modules.iter().map(|m| m.id).collect();

    let lessons = lesson::Entity::find()
      .filter(lesson::Column::ModuleId.is_in(module_ids))
      .order_by_asc(lesson::Column::Order)
      .find_with_related(material::Entity)
      .all(self.db)
      .await?;

    let mut tree: Vec<ModuleTree> = modules
      .into_iter()
      .map(|module| ModuleTree { module, lessons: Vec::new() })
      .collect();

    for (lesson, materials) in lessons {
      if let Some(node) = tree.iter_mut().find(|n| n.module.id == lesson.module_id)
      {
        node.lessons.push(LessonTree {
          video_source: lesson.video_source(),
          lesson,
          materials,
        });
      }
    }

    for node in &mut tree {
      node.lessons.sort_by_key(|l| l.lesson.order);
    }

    Ok(tree)
  }
}

#[cfg(test)]
mod tests {
  use sea_orm::{ActiveValue::Unchanged, DbErr};

  use super::*;
  use crate::{
    entity::{PaymentStatus, Role},
    sv::{self, testing},
  };

  fn new_course(title: &str, price: i64) -> NewCourse {
    NewCourse {
      title: title.into(),
      description: "About".into(),
      price,
      has_discount: false,
      discount_price: None,
      discount_expiry: None,
      status: CourseStatus::Published,
      is_public: true,
      allow_enrollment: true,
      max_students: 0,
      duration_hours: None,
      category_id: None,
    }
  }

  #[tokio::test]
  async fn test_slug_collision_gets_numeric_suffix() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let sv = Catalog::new(&db);

    let first = sv.create_course(&owner, new_course("Intro", 0)).await.unwrap();
    let second = sv.create_course(&owner, new_course("Intro", 0)).await.unwrap();
    let third = sv.create_course(&owner, new_course("intro!", 0)).await.unwrap();

    assert_eq!(first.slug, "intro");
    assert_eq!(second.slug, "intro-1");
    assert_eq!(third.slug, "intro-2");
  }

  #[tokio::test]
  async fn test_is_paid_follows_price() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let sv = Catalog::new(&db);

    let course = sv.create_course(&owner, new_course("Free", 0)).await.unwrap();
    assert!(!course.is_paid);

    let patch = CoursePatch { price: Some(1000), ..Default::default() };
    let course = sv.update_course(course, patch).await.unwrap();
    assert!(course.is_paid);
  }

  #[tokio::test]
  async fn test_input_validation_rejects_bad_pricing() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let sv = Catalog::new(&db);

    assert!(matches!(
      sv.create_course(&owner, new_course("Negative", -1)).await,
      Err(Error::Validation(_))
    ));

    let mut discounted = new_course("Discounted", 1000);
    discounted.has_discount = true;
    discounted.discount_price = Some(1500);
    assert!(matches!(
      sv.create_course(&owner, discounted).await,
      Err(Error::Validation(_))
    ));

    let course = sv.create_course(&owner, new_course("Ok", 1000)).await.unwrap();
    let patch = CoursePatch { has_discount: Some(true), ..Default::default() };
    assert!(matches!(
      sv.update_course(course, patch).await,
      Err(Error::Validation(_))
    ));
  }

  #[tokio::test]
  async fn test_entity_hook_rejects_direct_writes() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let course = testing::course(&db, &owner, "Direct", 1000).await;

    let res = course::ActiveModel { price: Set(-5), ..course.into() }
      .update(&db)
      .await;

    assert!(matches!(res, Err(DbErr::Custom(_))));
  }

  #[tokio::test]
  async fn test_entity_hook_checks_partial_writes() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let stranger = testing::user(&db, "stranger", Role::Student).await;
    let course = testing::course(&db, &owner, "Partial", 0).await;

    let res = course::ActiveModel {
      id: Unchanged(course.id),
      price: Set(-500),
      ..Default::default()
    }
    .update(&db)
    .await;
    assert!(matches!(res, Err(DbErr::Custom(_))));

    let discounted = course::ActiveModel {
      id: Unchanged(course.id),
      has_discount: Set(true),
      ..Default::default()
    }
    .update(&db)
    .await;
    assert!(matches!(discounted, Err(DbErr::Custom(_))));

    let paid = course::ActiveModel {
      id: Unchanged(course.id),
      price: Set(1000),
      ..Default::default()
    }
    .update(&db)
    .await
    .unwrap();
    assert_eq!(paid.price, 1000);
    assert!(paid.is_paid);

    let stored = Catalog::new(&db).course(course.id).await.unwrap();
    assert!(stored.is_paid);
    assert!(
      !sv::Access::new(&db)
        .has_content_access(Some(&stranger), &stored)
        .await
        .unwrap()
    );
  }

  #[tokio::test]
  async fn test_module_order_unique_per_course() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let a = testing::course(&db, &owner, "A", 0).await;
    let b = testing::course(&db, &owner, "B", 0).await;
    let sv = Catalog::new(&db);

    sv.create_module(&a, "One", None, 1).await.unwrap();
    sv.create_module(&b, "One", None, 1).await.unwrap();

    assert!(matches!(
      sv.create_module(&a, "Dup", None, 1).await,
      Err(Error::Validation(_))
    ));
  }

  #[tokio::test]
  async fn test_new_lesson_reopens_completed_enrollment() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let student = testing::user(&db, "student", Role::Student).await;
    let course = testing::course(&db, &owner, "Growing", 0).await;
    let module = testing::module(&db, &course, 1).await;
    let lesson = testing::lesson(&db, &module, 1).await;
    testing::enrollment(&db, &student, &course, PaymentStatus::Free).await;

    let progress = sv::Progress::new(&db);
    progress.mark_lesson_complete(&student, &lesson).await.unwrap();
    let enrollment = testing::refetch_enrollment(&db, &student, &course).await;
    assert!(enrollment.completed);

    let lesson = Catalog::new(&db)
      .create_lesson(
        &module,
        NewLesson {
          title: "Bonus".into(),
          content: String::new(),
          order: 2,
          duration: None,
          is_preview: false,
          video_file: None,
          video_url: None,
        },
      )
      .await
      .unwrap();
    let enrollment = testing::refetch_enrollment(&db, &student, &course).await;
    assert!(!enrollment.completed);
    assert!(enrollment.completed_at.is_none());

    Catalog::new(&db).delete_lesson(lesson).await.unwrap();
    let enrollment = testing::refetch_enrollment(&db, &student, &course).await;
    assert!(enrollment.completed);
  }

  #[tokio::test]
  async fn test_content_tree_is_ordered() {
    let db = testing::db().await;
    let owner = testing::user(&db, "instructor", Role::Instructor).await;
    let course = testing::course(&db, &owner, "Tree", 0).await;
    let second = testing::module(&db, &course, 2).await;
    let first = testing::module(&db, &course, 1).await;
    testing::lesson(&db, &first, 2).await;
    let opening = testing::lesson(&db, &first, 1).await;
    testing::material(&db, &opening).await;
    testing::lesson(&db, &second, 1).await;

    let tree = Catalog::new(&db).content(&course).await.unwrap();

    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].module.id, first.id);
    assert_eq!(tree[0].lessons.len(), 2);
    assert_eq!(tree[0].lessons[0].lesson.id, opening.id);
    assert_eq!(tree[0].lessons[0].materials.len(), 1);
    assert_eq!(tree[1].lessons.len(), 1);
  }
}
