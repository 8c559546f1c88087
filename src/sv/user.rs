use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{SaltString, rand_core::OsRng},
};
use uuid::Uuid;

use crate::{
  entity::{Role, group_permission, token, user},
  prelude::*,
  sv::provision,
};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map(|hash| hash.to_string())
      .map_err(|err| Error::Internal(format!("Failed to hash password: {err}")))
  }

  fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
      .map(|parsed| {
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
      })
      .unwrap_or(false)
  }

  pub async fn create(
    &self,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
  ) -> Result<user::Model> {
    let username = username.trim();
    if username.is_empty() {
      return Err(Error::Validation("Username is required".into()));
    }
    if password.len() < 8 {
      return Err(Error::Validation(
        "Password must be at least 8 characters".into(),
      ));
    }

    let user = user::ActiveModel {
      id: NotSet,
      username: Set(username.to_string()),
      email: Set(email.trim().to_string()),
      password_hash: Set(Self::hash_password(password)?),
      role: Set(role),
      created_at: Set(utils::now()),
    };

    user.insert(self.db).await.map_err(|err| {
      Error::on_unique(err, Error::Validation("Username is already taken".into()))
    })
  }

  /// Self-service sign up; admins are only created by provisioning.
  pub async fn register(
    &self,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
  ) -> Result<(user::Model, token::Model)> {
    if role == Role::Admin {
      return Err(Error::Forbidden);
    }

    let user = self.create(username, email, password, role).await?;
    let token = self.issue_token(user.id).await?;

    info!("Registered user `{}` as {:?}", user.username, user.role);
    Ok((user, token))
  }

  pub async fn login(
    &self,
    username: &str,
    password: &str,
  ) -> Result<(user::Model, token::Model)> {
    let user = user::Entity::find()
      .filter(user::Column::Username.eq(username.trim()))
      .one(self.db)
      .await?
      .ok_or(Error::Unauthorized)?;

    if !Self::verify_password(password, &user.password_hash) {
      return Err(Error::Unauthorized);
    }

    let token = self.issue_token(user.id).await?;
    Ok((user, token))
  }

  pub async fn logout(&self, key: &str) -> Result<()> {
    token::Entity::delete_by_id(key).exec(self.db).await?;
    Ok(())
  }

  pub async fn issue_token(&self, user_id: i64) -> Result<token::Model> {
    let token = token::ActiveModel {
      key: Set(Uuid::new_v4().simple().to_string()),
      user_id: Set(user_id),
      created_at: Set(utils::now()),
    };

    Ok(token.insert(self.db).await?)
  }

  pub async fn by_token(&self, key: &str) -> Result<Option<user::Model>> {
    let found = token::Entity::find_by_id(key)
      .find_also_related(user::Entity)
      .one(self.db)
      .await?;

    Ok(found.and_then(|(_, user)| user))
  }

  pub async fn by_id(&self, id: i64) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn has_permission(
    &self,
    user: &user::Model,
    codename: &str,
  ) -> Result<bool> {
    let granted = group_permission::Entity::find()
      .filter(group_permission::Column::GroupName.eq(provision::group_of(user.role)))
      .filter(group_permission::Column::Codename.eq(codename))
      .count(self.db)
      .await?;

    Ok(granted > 0)
  }

  /// Fails with `Forbidden` unless the user's group carries `codename`.
  pub async fn require(&self, user: &user::Model, codename: &str) -> Result<()> {
    if self.has_permission(user, codename).await? {
      Ok(())
    } else {
      Err(Error::Forbidden)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing;

  #[tokio::test]
  async fn test_register_and_login() {
    let db = testing::db().await;
    let sv = User::new(&db);

    let (user, token) = sv
      .register("alice", "alice@example.com", "correct horse", Role::Student)
      .await
      .unwrap();

    assert_eq!(sv.by_token(&token.key).await.unwrap().unwrap().id, user.id);

    let (again, _) = sv.login("alice", "correct horse").await.unwrap();
    assert_eq!(again.id, user.id);

    assert!(matches!(
      sv.login("alice", "wrong password").await,
      Err(Error::Unauthorized)
    ));
  }

  #[tokio::test]
  async fn test_register_rejects_admin_and_duplicates() {
    let db = testing::db().await;
    let sv = User::new(&db);

    assert!(matches!(
      sv.register("root", "r@example.com", "password1", Role::Admin).await,
      Err(Error::Forbidden)
    ));

    sv.register("bob", "b@example.com", "password1", Role::Student)
      .await
      .unwrap();
    assert!(matches!(
      sv.register("bob", "b2@example.com", "password1", Role::Student).await,
      Err(Error::Validation(_))
    ));
  }

  #[tokio::test]
  async fn test_logout_revokes_token() {
    let db = testing::db().await;
    let sv = User::new(&db);
    let user = testing::user(&db, "carol", Role::Student).await;

    let token = sv.issue_token(user.id).await.unwrap();
    sv.logout(&token.key).await.unwrap();

    assert!(sv.by_token(&token.key).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_permissions_follow_role() {
    let db = testing::db().await;
    let sv = User::new(&db);

    let student = testing::user(&db, "s", Role::Student).await;
    let instructor = testing::user(&db, "i", Role::Instructor).await;

    assert!(sv.has_permission(&instructor, "add_course").await.unwrap());
    assert!(!sv.has_permission(&student, "add_course").await.unwrap());
    assert!(sv.has_permission(&student, "enroll_course").await.unwrap());
  }
}
