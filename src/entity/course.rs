//! Course entity - catalog root owning modules, lessons and materials

use chrono::Utc;
use sea_orm::{
  ActiveValue::{self, Set},
  Value,
  entity::prelude::*,
};
use serde::{Deserialize, Serialize};

#[derive(
  Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
  #[sea_orm(string_value = "draft")]
  Draft,
  #[sea_orm(string_value = "published")]
  Published,
  #[sea_orm(string_value = "archived")]
  Archived,
  #[sea_orm(string_value = "pending_review")]
  PendingReview,
}

impl Default for CourseStatus {
  fn default() -> Self {
    Self::Draft
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  pub title: String,
  #[sea_orm(unique)]
  pub slug: String,
  pub description: String,
  /// Price in cents
  pub price: i64,
  /// Always `price > 0`, maintained by the save hook
  pub is_paid: bool,
  pub has_discount: bool,
  pub discount_price: Option<i64>,
  pub discount_expiry: Option<DateTime>,
  pub status: CourseStatus,
  pub is_public: bool,
  pub allow_enrollment: bool,
  /// 0 means unlimited
  pub max_students: i32,
  /// Enrollments whose payment status grants access
  pub student_count: i32,
  pub duration_hours: Option<i32>,
  pub instructor_id: i64,
  pub category_id: Option<i64>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl Model {
  pub fn discount_active(&self, now: DateTime) -> bool {
    self.has_discount
      && self.discount_price.is_some()
      && self.discount_expiry.is_none_or(|expiry| expiry > now)
  }

  pub fn current_price(&self, now: DateTime) -> i64 {
    match self.discount_price {
      Some(discount) if self.discount_active(now) => discount,
      _ => self.price,
    }
  }

  pub fn has_capacity(&self) -> bool {
    self.max_students == 0 || self.student_count < self.max_students
  }

  pub fn is_available(&self) -> bool {
    self.allow_enrollment
      && self.has_capacity()
      && self.status == CourseStatus::Published
  }

  pub fn is_listed(&self) -> bool {
    self.status == CourseStatus::Published && self.is_public
  }
}

/// Field invariants shared by request validation and the save hook.
pub fn check_fields(
  price: i64,
  has_discount: bool,
  discount_price: Option<i64>,
  max_students: i32,
) -> Result<(), &'static str> {
  if price < 0 {
    return Err("Price cannot be negative");
  }
  if max_students < 0 {
    return Err("max_students cannot be negative");
  }
  if let Some(discount) = discount_price
    && discount < 0
  {
    return Err("Discount price cannot be negative");
  }
  if has_discount {
    match discount_price {
      None => return Err("Discount price is required when discount is set"),
      Some(discount) if discount >= price => {
        return Err("Discount price must be lower than the regular price");
      }
      Some(_) => {}
    }
  }
  Ok(())
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::user::Entity",
    from = "Column::InstructorId",
    to = "super::user::Column::Id",
    on_delete = "Cascade"
  )]
  Instructor,
  #[sea_orm(
    belongs_to = "super::category::Entity",
    from = "Column::CategoryId",
    to = "super::category::Column::Id",
    on_delete = "SetNull"
  )]
  Category,
  #[sea_orm(has_many = "super::module::Entity")]
  Modules,
  #[sea_orm(has_many = "super::enrollment::Entity")]
  Enrollments,
}

impl Related<super::user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Instructor.def()
  }
}

impl Related<super::category::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Category.def()
  }
}

impl Related<super::module::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Modules.def()
  }
}

impl Related<super::enrollment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Enrollments.def()
  }
}

/// Value being written, or the stored one for a partial update.
fn resolve<V>(
  value: &ActiveValue<V>,
  stored: Option<&Model>,
  field: fn(&Model) -> V,
) -> Result<V, DbErr>
where
  V: Into<Value> + Clone,
{
  match value.try_as_ref() {
    Some(value) => Ok(value.clone()),
    None => stored
      .map(field)
      .ok_or_else(|| DbErr::Custom("Course pricing fields are required".into())),
  }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
  async fn before_save<C>(mut self, db: &C, insert: bool) -> Result<Self, DbErr>
  where
    C: ConnectionTrait,
  {
    let partial = self.price.is_not_set()
      || self.has_discount.is_not_set()
      || self.discount_price.is_not_set()
      || self.max_students.is_not_set();

    let stored = match self.id.try_as_ref() {
      Some(&id) if partial && !insert => Some(
        Entity::find_by_id(id)
          .one(db)
          .await?
          .ok_or_else(|| DbErr::RecordNotFound(format!("Course {id}")))?,
      ),
      _ => None,
    };
    let stored = stored.as_ref();

    let price = resolve(&self.price, stored, |m| m.price)?;
    check_fields(
      price,
      resolve(&self.has_discount, stored, |m| m.has_discount)?,
      resolve(&self.discount_price, stored, |m| m.discount_price)?,
      resolve(&self.max_students, stored, |m| m.max_students)?,
    )
    .map_err(|msg| DbErr::Custom(msg.to_string()))?;

    self.is_paid = Set(price > 0);
    self.updated_at = Set(Utc::now().naive_utc());
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeDelta;

  use super::*;

  fn course(price: i64) -> Model {
    let now = Utc::now().naive_utc();
    Model {
      id: 1,
      title: "Intro".into(),
      slug: "intro".into(),
      description: String::new(),
      price,
      is_paid: price > 0,
      has_discount: false,
      discount_price: None,
      discount_expiry: None,
      status: CourseStatus::Published,
      is_public: true,
      allow_enrollment: true,
      max_students: 0,
      student_count: 0,
      duration_hours: None,
      instructor_id: 1,
      category_id: None,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn test_field_checks() {
    assert!(check_fields(0, false, None, 0).is_ok());
    assert!(check_fields(-1, false, None, 0).is_err());
    assert!(check_fields(1000, false, None, -1).is_err());
    assert!(check_fields(1000, true, None, 0).is_err());
    assert!(check_fields(1000, true, Some(1000), 0).is_err());
    assert!(check_fields(1000, true, Some(500), 0).is_ok());
  }

  #[test]
  fn test_current_price_respects_expiry() {
    let now = Utc::now().naive_utc();
    let mut course = course(1000);
    course.has_discount = true;
    course.discount_price = Some(700);

    assert_eq!(course.current_price(now), 700);

    course.discount_expiry = Some(now - TimeDelta::hours(1));
    assert_eq!(course.current_price(now), 1000);

    course.discount_expiry = Some(now + TimeDelta::hours(1));
    assert_eq!(course.current_price(now), 700);
  }

  #[test]
  fn test_availability() {
    let mut course = course(0);
    assert!(course.is_available());

    course.max_students = 1;
    course.student_count = 1;
    assert!(!course.is_available());

    course.max_students = 0;
    course.status = CourseStatus::Draft;
    assert!(!course.is_available());
  }
}
