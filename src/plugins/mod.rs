pub mod server;

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::state::AppState;

#[async_trait::async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

/// Supervisor restarting each plugin after it stops or crashes.
pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self { plugins: Vec::new() }
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  pub async fn run(self, app: Arc<AppState>) {
    for plugin in self.plugins {
      let app = app.clone();

      tokio::spawn(async move {
        let name = plugin.name();
        info!("SYSTEM: Plugin `{name}` initialized");

        loop {
          let handle = tokio::spawn({
            let app = app.clone();
            let plugin = plugin.clone();
            async move { plugin.start(app).await }
          });

          match handle.await {
            Ok(Ok(())) => warn!("Plugin `{name}` stopped without an error"),
            Ok(Err(err)) => error!("Plugin `{name}` failed: {err:#}"),
            Err(err) if err.is_cancelled() => {
              info!("Plugin `{name}` shut down");
              break;
            }
            Err(_) => error!("Plugin `{name}` panicked"),
          }

          sleep(Duration::from_secs(5)).await;
          info!("SYSTEM: Restarting plugin `{name}`...");
        }
      });
    }
  }
}
