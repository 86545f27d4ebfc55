//! Key-value option store contract, SQLite implementation and read cache.
//!
//! # Responsibility
//! - Persist opaque JSON values under string keys.
//! - Offer key enumeration by prefix or substring for batch migrations.
//! - Provide a process-level read cache that migrations can invalidate.
//!
//! # Invariants
//! - Values are stored as JSON text; the store enforces no schema.
//! - A stored value that is not valid JSON surfaces as
//!   `RepoError::InvalidData` for that key only.

use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// Repository interface for the key-value option store.
pub trait OptionStore {
    fn get_option(&self, name: &str) -> RepoResult<Option<Value>>;
    fn set_option(&self, name: &str, value: &Value) -> RepoResult<()>;
    /// Returns whether a value was removed.
    fn delete_option(&self, name: &str) -> RepoResult<bool>;
    /// Lists keys starting with `prefix`, sorted.
    fn option_names_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>>;
    /// Lists keys containing `needle`, sorted.
    fn option_names_containing(&self, needle: &str) -> RepoResult<Vec<String>>;

    /// Drops any process-level read cache. Uncached stores do nothing.
    fn flush_cache(&self) {}

    /// Reads a value as a string. Numbers and booleans are rendered as text.
    fn get_string_option(&self, name: &str) -> RepoResult<Option<String>> {
        Ok(match self.get_option(name)? {
            Some(Value::String(value)) => Some(value),
            Some(Value::Number(value)) => Some(value.to_string()),
            Some(Value::Bool(value)) => Some(value.to_string()),
            Some(_) | None => None,
        })
    }

    /// Reads a value as a checkbox-style flag.
    ///
    /// `true`, non-zero numbers and non-empty strings other than `"0"` are set.
    fn get_flag_option(&self, name: &str) -> RepoResult<bool> {
        Ok(match self.get_option(name)? {
            Some(Value::Bool(value)) => value,
            Some(Value::Number(value)) => value.as_f64().is_some_and(|number| number != 0.0),
            Some(Value::String(value)) => !value.is_empty() && value != "0",
            Some(_) | None => false,
        })
    }
}

/// SQLite-backed option store.
pub struct SqliteOptionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOptionRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["options"])?;
        Ok(Self { conn })
    }
}

impl OptionStore for SqliteOptionRepository<'_> {
    fn get_option(&self, name: &str) -> RepoResult<Option<Value>> {
        let raw = self
            .conn
            .query_row(
                "SELECT value FROM options WHERE name = ?1;",
                [name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(text) => serde_json::from_str(&text).map(Some).map_err(|err| {
                RepoError::InvalidData(format!("option `{name}` is not valid JSON: {err}"))
            }),
            None => Ok(None),
        }
    }

    fn set_option(&self, name: &str, value: &Value) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO options (name, value)
             VALUES (?1, ?2)
             ON CONFLICT (name)
             DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![name, value.to_string()],
        )?;
        Ok(())
    }

    fn delete_option(&self, name: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM options WHERE name = ?1;", [name])?;
        Ok(changed > 0)
    }

    fn option_names_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>> {
        collect_names(
            self.conn,
            "SELECT name FROM options
             WHERE substr(name, 1, length(?1)) = ?1
             ORDER BY name ASC;",
            prefix,
        )
    }

    fn option_names_containing(&self, needle: &str) -> RepoResult<Vec<String>> {
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        collect_names(
            self.conn,
            "SELECT name FROM options
             WHERE instr(name, ?1) > 0
             ORDER BY name ASC;",
            needle,
        )
    }
}

fn collect_names(conn: &Connection, sql: &str, arg: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([arg], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Read-through cache in front of another option store.
///
/// Key enumeration always goes to the inner store. Writes update the cache.
pub struct CachedOptionStore<S> {
    inner: S,
    cache: RefCell<HashMap<String, Option<Value>>>,
}

impl<S: OptionStore> CachedOptionStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Number of keys currently held in the cache.
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<S: OptionStore> OptionStore for CachedOptionStore<S> {
    fn get_option(&self, name: &str) -> RepoResult<Option<Value>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(cached.clone());
        }
        let value = self.inner.get_option(name)?;
        self.cache
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        Ok(value)
    }

    fn set_option(&self, name: &str, value: &Value) -> RepoResult<()> {
        self.inner.set_option(name, value)?;
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Some(value.clone()));
        Ok(())
    }

    fn delete_option(&self, name: &str) -> RepoResult<bool> {
        let removed = self.inner.delete_option(name)?;
        self.cache.borrow_mut().insert(name.to_string(), None);
        Ok(removed)
    }

    fn option_names_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>> {
        self.inner.option_names_with_prefix(prefix)
    }

    fn option_names_containing(&self, needle: &str) -> RepoResult<Vec<String>> {
        self.inner.option_names_containing(needle)
    }

    fn flush_cache(&self) {
        self.cache.borrow_mut().clear();
        self.inner.flush_cache();
    }
}
