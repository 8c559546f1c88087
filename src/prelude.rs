pub use std::{sync::Arc, time::Duration};

pub use anyhow::Context;
pub use chrono::{NaiveDateTime as DateTime, Utc};
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection,
  EntityTrait, ModelTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder,
  QuerySelect, RelationTrait, Set, TransactionTrait,
};
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Result};
pub(crate) use crate::utils;
