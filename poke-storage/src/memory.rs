use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{self, AtomicU64},
        RwLock,
    },
};

use async_trait::async_trait;
use serde_json::Value;

use poke_slo::{errors, Result};

use crate::{
    assigned_id, unique_values, user::User, CredentialStore, Entity, FindOptions,
    Order, Repository,
};

/// Process-local table, keyed by primary key.
pub struct Memory<T> {
    rows: RwLock<BTreeMap<u64, T>>,
    sequence: AtomicU64,
}

impl<T> Memory<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            sequence: AtomicU64::new(0),
        }
    }
}

impl<T> Default for Memory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Memory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for Memory<T> {
    async fn find_by_id(&self, id: u64) -> Result<Option<T>> {
        let rows = self.rows.read().map_err(errors::any)?;
        Ok(rows.get(&id).cloned())
    }

    async fn find_many(&self, opts: &FindOptions) -> Result<Vec<T>> {
        let rows = self.rows.read().map_err(errors::any)?;
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows.values() {
            let value = serde_json::to_value(row).map_err(errors::any)?;
            if let Some(needle) = &opts.search {
                if !matches::<T>(&value, needle) {
                    continue;
                }
            }
            let key = value.get(opts.order_by).cloned().unwrap_or(Value::Null);
            keyed.push((key, row.clone()));
        }
        keyed.sort_by(|(a, _), (b, _)| match opts.order {
            Order::Asc => compare(a, b),
            Order::Desc => compare(b, a),
        });
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    async fn save(&self, record: &T) -> Result<T> {
        let mut rows = self.rows.write().map_err(errors::any)?;
        if let Some(field) = conflict(&rows, record)? {
            return Err(errors::conflict(&format!("{field} is already in use")));
        }
        let id = match assigned_id(record) {
            Some(id) => {
                self.sequence.fetch_max(id, atomic::Ordering::SeqCst);
                id
            }
            None => self.sequence.fetch_add(1, atomic::Ordering::SeqCst) + 1,
        };
        let mut stored = record.clone();
        stored.set_id(id);
        rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn remove(&self, record: &T) -> Result<T> {
        let id = record
            .id()
            .ok_or_else(|| errors::not_found(&format!("{} has no id", T::NAME)))?;
        let mut rows = self.rows.write().map_err(errors::any)?;
        rows.remove(&id);
        Ok(record.clone())
    }

    async fn taken(&self, record: &T) -> Result<Option<&'static str>> {
        let rows = self.rows.read().map_err(errors::any)?;
        conflict(&rows, record)
    }
}

/// A unique property of `record` held by a row other than the record itself.
fn conflict<T: Entity>(
    rows: &BTreeMap<u64, T>,
    record: &T,
) -> Result<Option<&'static str>> {
    let wanted = unique_values(record)?;
    if wanted.is_empty() {
        return Ok(None);
    }
    let own = assigned_id(record);
    for (id, row) in rows {
        if Some(*id) == own {
            continue;
        }
        let held = serde_json::to_value(row).map_err(errors::any)?;
        if let Some((field, _)) =
            wanted.iter().find(|(field, v)| held.get(*field) == Some(v))
        {
            return Ok(Some(*field));
        }
    }
    Ok(None)
}

#[async_trait]
impl CredentialStore for Memory<User> {
    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let rows = self.rows.read().map_err(errors::any)?;
        Ok(rows
            .values()
            .find(|user| user.token.as_deref() == Some(token))
            .cloned())
    }
}

/// Case-insensitive substring match over every declared field, like
/// `LIKE '%needle%'` under a case-insensitive collation.
fn matches<T: Entity>(value: &Value, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    T::FIELDS.iter().any(|field| match value.get(*field) {
        Some(Value::String(v)) => v.to_lowercase().contains(&needle),
        Some(Value::Number(v)) => v.to_string().contains(&needle),
        Some(Value::Bool(v)) => v.to_string().contains(&needle),
        _ => false,
    })
}

/// NULL sorts first and text ignores case, as in MySQL.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            x.to_lowercase().cmp(&y.to_lowercase())
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}
