mod mariadb;
mod memory;
mod model;
pub mod pokemon;
pub mod poketeam;
mod pool;
pub mod user;

pub use mariadb::MariaDb;
pub use memory::Memory;
pub use model::{FindOptions, Order};
pub use pool::connection_manager;

use std::fmt::Debug;

use async_trait::async_trait;
use mockall::automock;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use poke_slo::{errors, Result};

use crate::user::User;

/// Table metadata shared by every record type served over HTTP.
pub trait Entity:
    Serialize
    + DeserializeOwned
    + Validate
    + Clone
    + PartialEq
    + Debug
    + Send
    + Sync
    + Unpin
    + 'static
{
    /// Resource name, used as the base path segment.
    const NAME: &'static str;
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str;
    /// Declared properties in declaration order, primary key first.
    const FIELDS: &'static [&'static str];
    /// Properties no two records may share a value for.
    const UNIQUE: &'static [&'static str] = &[];

    fn id(&self) -> Option<u64>;
    fn set_id(&mut self, id: u64);
}

#[automock]
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<T>>;
    async fn find_many(&self, opts: &FindOptions) -> Result<Vec<T>>;
    /// Inserts or replaces the record, assigning an id when it has none.
    async fn save(&self, record: &T) -> Result<T>;
    async fn remove(&self, record: &T) -> Result<T>;
    /// First unique property whose value another record already holds.
    async fn taken(&self, record: &T) -> Result<Option<&'static str>>;

    /// Loads the record named by the primary key in `partial` and overlays
    /// the declared fields of `partial` onto it.
    async fn preload(&self, partial: &Map<String, Value>) -> Result<Option<T>> {
        let Some(id) = primary_key::<T>(partial) else {
            return Ok(None);
        };
        match self.find_by_id(id).await? {
            Some(existing) => merge(&existing, partial).map(Some),
            None => Ok(None),
        }
    }
}

#[automock]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_token(&self, token: &str) -> Result<Option<User>>;
}

/// The record's key, with `0` read as unassigned like an AUTO_INCREMENT
/// column reads it.
pub fn assigned_id<T: Entity>(record: &T) -> Option<u64> {
    record.id().filter(|id| *id != 0)
}

/// Non-null values of the record's unique properties.
fn unique_values<T: Entity>(record: &T) -> Result<Vec<(&'static str, Value)>> {
    if T::UNIQUE.is_empty() {
        return Ok(Vec::new());
    }
    let value = serde_json::to_value(record).map_err(errors::any)?;
    Ok(T::UNIQUE
        .iter()
        .filter_map(|field| match value.get(*field) {
            None | Some(Value::Null) => None,
            Some(v) => Some((*field, v.clone())),
        })
        .collect())
}

pub fn primary_key<T: Entity>(partial: &Map<String, Value>) -> Option<u64> {
    match partial.get(T::PRIMARY_KEY)? {
        Value::Number(v) => v.as_u64(),
        Value::String(v) => v.parse().ok(),
        _ => None,
    }
}

pub fn merge<T: Entity>(existing: &T, partial: &Map<String, Value>) -> Result<T> {
    let mut value = serde_json::to_value(existing).map_err(errors::any)?;
    if let Value::Object(fields) = &mut value {
        // The key already named the existing record; keep its stored form.
        for (key, v) in partial {
            if key != T::PRIMARY_KEY && T::FIELDS.contains(&key.as_str()) {
                fields.insert(key.clone(), v.clone());
            }
        }
    }
    serde_json::from_value(value).map_err(|err| errors::bad_request(&err))
}
