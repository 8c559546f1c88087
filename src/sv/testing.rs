//! Fixtures shared by the service tests

use migration::MigratorTrait;

use crate::{
  entity::{
    CourseStatus, PaymentStatus, Role, course, enrollment, lesson, material,
    module, user,
  },
  prelude::*,
  sv::Provision,
};

async fn prepare(db: DatabaseConnection) -> DatabaseConnection {
  migration::Migrator::up(&db, None).await.unwrap();
  Provision::new(&db).run(None).await.unwrap();
  db
}

/// Single-connection in-memory database.
pub async fn db() -> DatabaseConnection {
  prepare(Database::connect("sqlite::memory:").await.unwrap()).await
}

/// File database with a real connection pool, for tests that need
/// transactions racing each other. Keep the directory alive for the test.
pub async fn file_db() -> (tempfile::TempDir, DatabaseConnection) {
  let dir = tempfile::tempdir().unwrap();
  let url = format!("sqlite:{}?mode=rwc", dir.path().join("academy.db").display());
  let db = prepare(Database::connect(url).await.unwrap()).await;
  (dir, db)
}

pub async fn user(db: &DatabaseConnection, name: &str, role: Role) -> user::Model {
  user::ActiveModel {
    id: NotSet,
    username: Set(name.into()),
    email: Set(format!("{name}@example.com")),
    password_hash: Set("!".into()),
    role: Set(role),
    created_at: Set(utils::now()),
  }
  .insert(db)
  .await
  .unwrap()
}

/// Published, public and open course with unlimited seats.
pub async fn course(
  db: &DatabaseConnection,
  owner: &user::Model,
  title: &str,
  price: i64,
) -> course::Model {
  let now = utils::now();
  course::ActiveModel {
    id: NotSet,
    title: Set(title.into()),
    slug: Set(utils::slugify(title)),
    description: Set(String::new()),
    price: Set(price),
    is_paid: Set(price > 0),
    has_discount: Set(false),
    discount_price: Set(None),
    discount_expiry: Set(None),
    status: Set(CourseStatus::Published),
    is_public: Set(true),
    allow_enrollment: Set(true),
    max_students: Set(0),
    student_count: Set(0),
    duration_hours: Set(None),
    instructor_id: Set(owner.id),
    category_id: Set(None),
    created_at: Set(now),
    updated_at: Set(now),
  }
  .insert(db)
  .await
  .unwrap()
}

pub async fn module(
  db: &DatabaseConnection,
  course: &course::Model,
  order: i32,
) -> module::Model {
  module::ActiveModel {
    id: NotSet,
    course_id: Set(course.id),
    title: Set(format!("Module {order}")),
    description: Set(None),
    order: Set(order),
    created_at: Set(utils::now()),
  }
  .insert(db)
  .await
  .unwrap()
}

pub async fn lesson(
  db: &DatabaseConnection,
  module: &module::Model,
  order: i32,
) -> lesson::Model {
  lesson::ActiveModel {
    id: NotSet,
    module_id: Set(module.id),
    title: Set(format!("Lesson {order}")),
    content: Set(format!("Body of lesson {order}")),
    order: Set(order),
    duration: Set(None),
    is_preview: Set(false),
    video_file: Set(None),
    video_url: Set(None),
    created_at: Set(utils::now()),
  }
  .insert(db)
  .await
  .unwrap()
}

pub async fn material(
  db: &DatabaseConnection,
  lesson: &lesson::Model,
) -> material::Model {
  material::ActiveModel {
    id: NotSet,
    lesson_id: Set(lesson.id),
    title: Set("Slides".into()),
    description: Set(None),
    file_path: Set(format!("materials/{}.pdf", lesson.id)),
    created_at: Set(utils::now()),
  }
  .insert(db)
  .await
  .unwrap()
}

/// Inserts an enrollment directly, keeping the course's student count in step.
pub async fn enrollment(
  db: &DatabaseConnection,
  user: &user::Model,
  course: &course::Model,
  status: PaymentStatus,
) -> enrollment::Model {
  let enrollment = enrollment::ActiveModel {
    id: NotSet,
    user_id: Set(user.id),
    course_id: Set(course.id),
    enrolled_at: Set(utils::now()),
    payment_status: Set(status),
    amount_paid: Set(0),
    completed: Set(false),
    completed_at: Set(None),
  }
  .insert(db)
  .await
  .unwrap();

  if status.grants_access() {
    course::Entity::update_many()
      .col_expr(
        course::Column::StudentCount,
        sea_orm::sea_query::Expr::col(course::Column::StudentCount).add(1),
      )
      .filter(course::Column::Id.eq(course.id))
      .exec(db)
      .await
      .unwrap();
  }

  enrollment
}

pub async fn refetch_enrollment(
  db: &DatabaseConnection,
  user: &user::Model,
  course: &course::Model,
) -> enrollment::Model {
  enrollment::Entity::find()
    .filter(enrollment::Column::UserId.eq(user.id))
    .filter(enrollment::Column::CourseId.eq(course.id))
    .one(db)
    .await
    .unwrap()
    .unwrap()
}
