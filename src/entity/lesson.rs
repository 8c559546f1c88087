use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
  File,
  Url,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lessons")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  pub module_id: i64,
  pub title: String,
  pub content: String,
  /// Unique within the module
  pub order: i32,
  /// Minutes
  pub duration: Option<i32>,
  pub is_preview: bool,
  /// Path relative to the media root
  pub video_file: Option<String>,
  pub video_url: Option<String>,
  pub created_at: DateTime,
}

impl Model {
  pub fn video_source(&self) -> Option<VideoSource> {
    if self.video_file.is_some() {
      Some(VideoSource::File)
    } else if self.video_url.is_some() {
      Some(VideoSource::Url)
    } else {
      None
    }
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::module::Entity",
    from = "Column::ModuleId",
    to = "super::module::Column::Id",
    on_delete = "Cascade"
  )]
  Module,
  #[sea_orm(has_many = "super::material::Entity")]
  Materials,
  #[sea_orm(has_many = "super::progress::Entity")]
  Progress,
}

impl Related<super::module::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Module.def()
  }
}

impl Related<super::material::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Materials.def()
  }
}

impl Related<super::progress::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Progress.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
