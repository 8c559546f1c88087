use migration::MigratorTrait;

use crate::{config::Config, prelude::*, sv};

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub catalog: sv::Catalog<'a>,
  pub access: sv::Access<'a>,
  pub enrollment: sv::Enrollment<'a>,
  pub progress: sv::Progress<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
}

impl AppState {
  pub async fn with_config(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    migration::Migrator::up(&db, None)
      .await
      .context("Failed to run migrations")?;

    info!("Provisioning groups...");
    sv::Provision::new(&db)
      .run(config.admin.as_ref())
      .await
      .context("Failed to provision groups")?;

    Ok(Self::from_parts(db, config))
  }

  pub fn from_parts(db: DatabaseConnection, config: Config) -> Self {
    Self { db, config }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      catalog: sv::Catalog::new(&self.db),
      access: sv::Access::new(&self.db),
      enrollment: sv::Enrollment::new(&self.db),
      progress: sv::Progress::new(&self.db),
    }
  }
}
