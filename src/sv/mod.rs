pub mod access;
pub mod catalog;
pub mod enrollment;
pub mod ownership;
pub mod progress;
pub mod provision;
pub mod user;

pub use access::Access;
pub use catalog::Catalog;
pub use enrollment::Enrollment;
pub use ownership::OwnsCourse;
pub use progress::Progress;
pub use provision::Provision;
pub use user::User;

#[cfg(test)]
pub(crate) mod testing;
