//! SeaORM entity definitions

pub mod category;
pub mod course;
pub mod enrollment;
pub mod group;
pub mod group_permission;
pub mod lesson;
pub mod material;
pub mod module;
pub mod progress;
pub mod token;
pub mod user;

pub use course::CourseStatus;
pub use enrollment::PaymentStatus;
pub use user::Role;
