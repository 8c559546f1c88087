//! Idempotent startup provisioning of permission groups and the admin account

use crate::{
  config::AdminAccount,
  entity::{Role, group, group_permission, user},
  prelude::*,
  sv,
};

const STUDENT_PERMS: &[&str] = &["view_course", "enroll_course"];

const INSTRUCTOR_PERMS: &[&str] = &[
  "view_course",
  "enroll_course",
  "add_course",
  "change_course",
  "delete_course",
  "complete_enrollment",
];

const ADMIN_PERMS: &[&str] = &[
  "view_course",
  "enroll_course",
  "add_course",
  "change_course",
  "delete_course",
  "complete_enrollment",
  "manage_payments",
  "manage_categories",
];

pub fn group_of(role: Role) -> &'static str {
  match role {
    Role::Student => "Students",
    Role::Instructor => "Instructors",
    Role::Admin => "Admins",
  }
}

fn permissions_of(role: Role) -> &'static [&'static str] {
  match role {
    Role::Student => STUDENT_PERMS,
    Role::Instructor => INSTRUCTOR_PERMS,
    Role::Admin => ADMIN_PERMS,
  }
}

pub struct Provision<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Provision<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn run(&self, admin: Option<&AdminAccount>) -> Result<()> {
    for role in [Role::Student, Role::Instructor, Role::Admin] {
      self.ensure_group(role).await?;
    }

    if let Some(admin) = admin {
      self.ensure_admin(admin).await?;
    }

    Ok(())
  }

  async fn ensure_group(&self, role: Role) -> Result<()> {
    let name = group_of(role);
    let txn = self.db.begin().await?;

    let created = if group::Entity::find_by_id(name).one(&txn).await?.is_none()
    {
      group::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(utils::now()),
      }
      .insert(&txn)
      .await?;
      true
    } else {
      false
    };

    group_permission::Entity::delete_many()
      .filter(group_permission::Column::GroupName.eq(name))
      .exec(&txn)
      .await?;

    let perms = permissions_of(role).iter().map(|codename| {
      group_permission::ActiveModel {
        group_name: Set(name.to_string()),
        codename: Set(codename.to_string()),
      }
    });
    group_permission::Entity::insert_many(perms)
      .exec_without_returning(&txn)
      .await?;

    txn.commit().await?;

    info!(
      "Group `{name}` {}: {:?}",
      if created { "created" } else { "already exists" },
      permissions_of(role)
    );
    Ok(())
  }

  async fn ensure_admin(&self, admin: &AdminAccount) -> Result<()> {
    let existing = user::Entity::find()
      .filter(user::Column::Username.eq(admin.username.as_str()))
      .one(self.db)
      .await?;

    match existing {
      Some(user) if user.role != Role::Admin => {
        warn!("User `{}` exists but is not an admin", user.username);
      }
      Some(_) => {}
      None => {
        sv::User::new(self.db)
          .create(&admin.username, "", &admin.password, Role::Admin)
          .await?;
        info!("Provisioned admin account `{}`", admin.username);
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing;

  #[tokio::test]
  async fn test_provision_is_idempotent() {
    let db = testing::db().await;
    let admin = AdminAccount {
      username: "root".into(),
      password: "supersecret".into(),
    };

    let sv = Provision::new(&db);
    sv.run(Some(&admin)).await.unwrap();
    sv.run(Some(&admin)).await.unwrap();

    assert_eq!(group::Entity::find().count(&db).await.unwrap(), 3);
    assert_eq!(
      group_permission::Entity::find()
        .filter(group_permission::Column::GroupName.eq("Admins"))
        .count(&db)
        .await
        .unwrap(),
      ADMIN_PERMS.len() as u64
    );
    assert_eq!(
      user::Entity::find()
        .filter(user::Column::Role.eq(Role::Admin))
        .count(&db)
        .await
        .unwrap(),
      1
    );
  }
}
