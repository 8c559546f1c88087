use std::{
  path::{Component, Path as FsPath, PathBuf},
  sync::Arc,
};

use axum::{
  Json,
  body::Body,
  extract::{Path, Request, State},
  http::header,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::Auth;
use crate::{
  entity::lesson::VideoSource,
  prelude::*,
  state::AppState,
  sv::OwnsCourse,
};

/// Joins a stored relative path onto the media root, refusing escapes.
fn media_path(root: &FsPath, relative: &str) -> Result<PathBuf> {
  let relative = FsPath::new(relative);
  if relative.components().all(|c| matches!(c, Component::Normal(_))) {
    Ok(root.join(relative))
  } else {
    warn!("Rejected media path `{}`", relative.display());
    Err(Error::NotFound("File"))
  }
}

#[derive(Debug, Serialize)]
pub struct VideoInfo {
  pub lesson_id: i64,
  pub has_video: bool,
  pub video_type: Option<VideoSource>,
  pub duration: Option<i32>,
  pub video_url: Option<String>,
}

pub async fn video(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<Json<VideoInfo>> {
  let sv = app.sv();
  let lesson = sv.catalog.lesson(id).await?;
  if !sv.access.has_video_access(Some(&user), &lesson).await? {
    return Err(Error::NotEnrolled);
  }

  let video_type = lesson.video_source();
  let video_url = match video_type {
    Some(VideoSource::File) => Some(format!("/lessons/{}/stream", lesson.id)),
    Some(VideoSource::Url) => lesson.video_url.clone(),
    None => None,
  };

  Ok(Json(VideoInfo {
    lesson_id: lesson.id,
    has_video: video_type.is_some(),
    video_type,
    duration: lesson.duration,
    video_url,
  }))
}

/// Range requests are answered by `ServeFile` once access is granted.
pub async fn stream(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
  req: Request,
) -> Result<Response> {
  let sv = app.sv();
  let lesson = sv.catalog.lesson(id).await?;
  if !sv.access.has_video_access(Some(&user), &lesson).await? {
    return Err(Error::NotEnrolled);
  }

  let file = lesson.video_file.ok_or(Error::NotFound("Video file"))?;
  let path = media_path(&app.config.media_root, &file)?;

  debug!("Streaming `{}` to user {}", path.display(), user.id);
  match ServeFile::new(path).oneshot(req).await {
    Ok(res) => Ok(res.map(Body::new)),
    Err(never) => match never {},
  }
}

pub async fn download(
  State(app): State<Arc<AppState>>,
  Path(id): Path<i64>,
  Auth { user, .. }: Auth,
) -> Result<impl IntoResponse> {
  let sv = app.sv();
  let material = sv.catalog.material(id).await?;
  let course = material.owning_course(&app.db).await?;
  sv.access.require_content(&user, &course).await?;

  let path = media_path(&app.config.media_root, &material.file_path)?;
  let file = match tokio::fs::File::open(&path).await {
    Ok(file) => file,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
      warn!("Material {} is missing `{}`", material.id, path.display());
      return Err(Error::NotFound("File"));
    }
    Err(err) => return Err(err.into()),
  };

  let filename = path
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or("material.bin")
    .to_string();

  let body = Body::from_stream(ReaderStream::new(file));
  let headers = [
    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
    (
      header::CONTENT_DISPOSITION,
      format!("attachment; filename=\"{filename}\""),
    ),
  ];

  Ok((headers, body))
}
