use std::{fmt, marker::PhantomData};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    mysql::{MySqlArguments, MySqlRow},
    query::{Query, QueryAs},
    FromRow, MySql, MySqlPool,
};

use poke_slo::{errors, errors::WithBacktrace, Result};

use crate::{
    assigned_id, unique_values, user::User, CredentialStore, Entity, FindOptions,
    Repository,
};

/// Table-backed repository; every statement is derived from the entity's
/// declared fields.
pub struct MariaDb<T> {
    pool: MySqlPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> MariaDb<T> {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for MariaDb<T> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<T> fmt::Debug for MariaDb<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MariaDb").field("pool", &self.pool).finish()
    }
}

fn columns<T: Entity>() -> String {
    T::FIELDS
        .iter()
        .map(|field| format!("`{field}`"))
        .collect::<Vec<_>>()
        .join(",")
}

fn select_one<T: Entity>() -> String {
    format!(
        "SELECT {} FROM `{}` WHERE `{}` = ?;",
        columns::<T>(),
        T::TABLE,
        T::PRIMARY_KEY
    )
}

fn select_many<T: Entity>(opts: &FindOptions) -> String {
    let mut sql = format!("SELECT {} FROM `{}`", columns::<T>(), T::TABLE);
    if opts.search.is_some() {
        let wheres = T::FIELDS
            .iter()
            .map(|field| format!("CAST(`{field}` AS CHAR) LIKE ?"))
            .collect::<Vec<_>>()
            .join(" OR ");
        sql.push_str(" WHERE ");
        sql.push_str(&wheres);
    }
    sql.push_str(&format!(
        " ORDER BY `{}` {};",
        opts.order_by,
        opts.order.as_sql()
    ));
    sql
}

/// Columns written by an insert, skipping the primary key when the record
/// does not carry one yet.
fn writable<T: Entity>(record: &T) -> Vec<&'static str> {
    let keyed = assigned_id(record).is_some();
    T::FIELDS
        .iter()
        .copied()
        .filter(|field| *field != T::PRIMARY_KEY || keyed)
        .collect()
}

fn insert<T: Entity>(fields: &[&str]) -> String {
    format!(
        "INSERT INTO `{}` ({}) VALUES({});",
        T::TABLE,
        fields
            .iter()
            .map(|field| format!("`{field}`"))
            .collect::<Vec<_>>()
            .join(","),
        vec!["?"; fields.len()].join(",")
    )
}

/// Every declared column but the key, which is bound last.
fn update<T: Entity>() -> String {
    format!(
        "UPDATE `{}` SET {} WHERE `{}` = ?;",
        T::TABLE,
        T::FIELDS
            .iter()
            .filter(|field| **field != T::PRIMARY_KEY)
            .map(|field| format!("`{field}` = ?"))
            .collect::<Vec<_>>()
            .join(","),
        T::PRIMARY_KEY
    )
}

fn unique_holder<T: Entity>(field: &str, keyed: bool) -> String {
    let mut sql = format!(
        "SELECT `{}` FROM `{}` WHERE `{field}` = ?",
        T::PRIMARY_KEY,
        T::TABLE
    );
    if keyed {
        sql.push_str(&format!(" AND `{}` <> ?", T::PRIMARY_KEY));
    }
    sql.push_str(" LIMIT 1;");
    sql
}

fn write_error(err: sqlx::Error) -> WithBacktrace {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => errors::conflict(db.message()),
        _ => errors::any(err),
    }
}

fn delete<T: Entity>() -> String {
    format!(
        "DELETE FROM `{}` WHERE `{}` = ?;",
        T::TABLE,
        T::PRIMARY_KEY
    )
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: Option<&Value>,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        None | Some(Value::Null) => query.bind(None::<String>),
        Some(Value::Bool(v)) => query.bind(*v),
        Some(Value::Number(v)) => {
            if let Some(n) = v.as_u64() {
                query.bind(n)
            } else if let Some(n) = v.as_i64() {
                query.bind(n)
            } else {
                query.bind(v.as_f64())
            }
        }
        Some(Value::String(v)) => query.bind(v.clone()),
        Some(other) => query.bind(other.to_string()),
    }
}

fn bind_search<'q, T>(
    mut query: QueryAs<'q, MySql, T, MySqlArguments>,
    opts: &FindOptions,
    count: usize,
) -> QueryAs<'q, MySql, T, MySqlArguments> {
    if let Some(needle) = &opts.search {
        let pattern = format!("%{needle}%");
        for _ in 0..count {
            query = query.bind(pattern.clone());
        }
    }
    query
}

#[async_trait]
impl<T> Repository<T> for MariaDb<T>
where
    T: Entity + for<'r> FromRow<'r, MySqlRow>,
{
    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: u64) -> Result<Option<T>> {
        let sql = select_one::<T>();
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(errors::any)
    }

    #[tracing::instrument(skip(self))]
    async fn find_many(&self, opts: &FindOptions) -> Result<Vec<T>> {
        let sql = select_many::<T>(opts);
        bind_search(sqlx::query_as::<_, T>(&sql), opts, T::FIELDS.len())
            .fetch_all(&self.pool)
            .await
            .map_err(errors::any)
    }

    #[tracing::instrument(skip(self))]
    async fn save(&self, record: &T) -> Result<T> {
        let value = serde_json::to_value(record).map_err(errors::any)?;
        let id = assigned_id(record);
        let existing = match id {
            Some(id) => self.find_by_id(id).await?.is_some(),
            None => false,
        };

        let executed = if existing {
            let sql = update::<T>();
            let mut query = sqlx::query(&sql);
            for field in T::FIELDS.iter().filter(|f| **f != T::PRIMARY_KEY) {
                query = bind_value(query, value.get(*field));
            }
            query.bind(id).execute(&self.pool).await
        } else {
            let fields = writable(record);
            let sql = insert::<T>(&fields);
            let mut query = sqlx::query(&sql);
            for field in &fields {
                query = bind_value(query, value.get(*field));
            }
            query.execute(&self.pool).await
        };
        let result = executed.map_err(write_error)?;

        let id = id.unwrap_or_else(|| result.last_insert_id());
        self.find_by_id(id)
            .await?
            .ok_or_else(|| errors::not_found(&format!("{} {id} vanished", T::NAME)))
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, record: &T) -> Result<T> {
        let id = record
            .id()
            .ok_or_else(|| errors::not_found(&format!("{} has no id", T::NAME)))?;
        sqlx::query(&delete::<T>())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(errors::any)?;
        Ok(record.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn taken(&self, record: &T) -> Result<Option<&'static str>> {
        let id = assigned_id(record);
        for (field, value) in unique_values(record)? {
            let sql = unique_holder::<T>(field, id.is_some());
            let mut query = bind_value(sqlx::query(&sql), Some(&value));
            if let Some(id) = id {
                query = query.bind(id);
            }
            let holder = query
                .fetch_optional(&self.pool)
                .await
                .map_err(errors::any)?;
            if holder.is_some() {
                return Ok(Some(field));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl CredentialStore for MariaDb<User> {
    #[tracing::instrument(skip(self, token))]
    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM `{}` WHERE `token` = ? LIMIT 1;",
            columns::<User>(),
            User::TABLE
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(errors::any)
    }
}
