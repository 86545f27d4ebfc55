//! Resource store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist resource field values keyed by field name.
//! - Track which categories tag a resource.
//!
//! # Invariants
//! - Resource rows are never validated against the host content store.
//! - `assign_container` leaves exactly one category of the target taxonomy.
//! - Category listings are ordered by assignment position, then id, so the
//!   "first container" of a resource is stable.

use crate::model::category::{Category, CategoryId};
use crate::model::resource::{FieldValue, ResourceId};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Repository interface for resource tagging and field values.
pub trait ResourceStore {
    /// Replaces the resource's categories of the target's taxonomy with
    /// exactly `category`.
    fn assign_container(&self, resource: ResourceId, category: CategoryId) -> RepoResult<()>;
    /// Lists categories of `taxonomy` tagging the resource, first one first.
    fn resource_categories(&self, resource: ResourceId, taxonomy: &str)
        -> RepoResult<Vec<Category>>;
    fn resources_in_category(&self, category: CategoryId) -> RepoResult<Vec<ResourceId>>;
    fn set_field_value(&self, resource: ResourceId, key: &str, value: &FieldValue)
        -> RepoResult<()>;
    fn get_field_value(&self, resource: ResourceId, key: &str) -> RepoResult<Option<FieldValue>>;
    /// Loads every field value of one resource.
    fn field_values(&self, resource: ResourceId) -> RepoResult<BTreeMap<String, FieldValue>>;
    /// Lists `(resource, key)` pairs whose key starts with `prefix`.
    ///
    /// Rows whose resource id is not a UUID are not listed.
    fn field_keys_with_prefix(&self, prefix: &str) -> RepoResult<Vec<(ResourceId, String)>>;
    /// Renames one field key, replacing any value already stored under `to`.
    ///
    /// Returns whether a row was renamed.
    fn rename_field_key(&self, resource: ResourceId, from: &str, to: &str) -> RepoResult<bool>;
}

/// SQLite-backed resource store.
pub struct SqliteResourceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteResourceRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["categories", "resource_categories", "resource_meta"])?;
        Ok(Self { conn })
    }
}

impl ResourceStore for SqliteResourceRepository<'_> {
    fn assign_container(&self, resource: ResourceId, category: CategoryId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let taxonomy = tx
            .query_row(
                "SELECT taxonomy FROM categories WHERE id = ?1;",
                [category],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or_else(|| RepoError::NotFound(format!("category {category}")))?;

        let resource_uuid = resource.to_string();
        tx.execute(
            "DELETE FROM resource_categories
             WHERE resource_uuid = ?1
               AND category_id IN (SELECT id FROM categories WHERE taxonomy = ?2);",
            params![resource_uuid, taxonomy],
        )?;
        tx.execute(
            "INSERT INTO resource_categories (resource_uuid, category_id, position)
             VALUES (?1, ?2, 0);",
            params![resource_uuid, category],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn resource_categories(
        &self,
        resource: ResourceId,
        taxonomy: &str,
    ) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                c.id,
                c.taxonomy,
                c.name,
                c.slug,
                c.parent_id,
                c.description
             FROM resource_categories rc
             INNER JOIN categories c ON c.id = rc.category_id
             WHERE rc.resource_uuid = ?1
               AND c.taxonomy = ?2
             ORDER BY rc.position ASC, c.id ASC;",
        )?;
        let rows = stmt.query_map(params![resource.to_string(), taxonomy], |row| {
            Ok(Category {
                id: row.get(0)?,
                taxonomy: row.get(1)?,
                name: row.get(2)?,
                slug: row.get(3)?,
                parent_id: row.get(4)?,
                description: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn resources_in_category(&self, category: CategoryId) -> RepoResult<Vec<ResourceId>> {
        let mut stmt = self.conn.prepare(
            "SELECT resource_uuid FROM resource_categories
             WHERE category_id = ?1
             ORDER BY resource_uuid ASC;",
        )?;
        let mut rows = stmt.query([category])?;
        let mut resources = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get(0)?;
            resources.push(parse_uuid(&uuid_text)?);
        }
        Ok(resources)
    }

    fn set_field_value(
        &self,
        resource: ResourceId,
        key: &str,
        value: &FieldValue,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO resource_meta (resource_uuid, meta_key, meta_value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (resource_uuid, meta_key)
             DO UPDATE SET
                meta_value = excluded.meta_value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![resource.to_string(), key, value.to_value().to_string()],
        )?;
        Ok(())
    }

    fn get_field_value(&self, resource: ResourceId, key: &str) -> RepoResult<Option<FieldValue>> {
        let raw = self
            .conn
            .query_row(
                "SELECT meta_value FROM resource_meta
                 WHERE resource_uuid = ?1 AND meta_key = ?2;",
                params![resource.to_string(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        raw.map(|text| parse_field_value(key, &text)).transpose()
    }

    fn field_values(&self, resource: ResourceId) -> RepoResult<BTreeMap<String, FieldValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT meta_key, meta_value FROM resource_meta
             WHERE resource_uuid = ?1
             ORDER BY meta_key ASC;",
        )?;
        let mut rows = stmt.query([resource.to_string()])?;
        let mut values = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            let text: String = row.get(1)?;
            let value = parse_field_value(&key, &text)?;
            values.insert(key, value);
        }
        Ok(values)
    }

    fn field_keys_with_prefix(&self, prefix: &str) -> RepoResult<Vec<(ResourceId, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT resource_uuid, meta_key FROM resource_meta
             WHERE substr(meta_key, 1, length(?1)) = ?1
             ORDER BY resource_uuid ASC, meta_key ASC;",
        )?;
        let mut rows = stmt.query([prefix])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get(0)?;
            let key: String = row.get(1)?;
            if let Ok(resource) = Uuid::parse_str(&uuid_text) {
                keys.push((resource, key));
            }
        }
        Ok(keys)
    }

    fn rename_field_key(&self, resource: ResourceId, from: &str, to: &str) -> RepoResult<bool> {
        if from == to {
            return Ok(false);
        }
        let changed = self.conn.execute(
            "UPDATE OR REPLACE resource_meta
             SET
                meta_key = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE resource_uuid = ?1 AND meta_key = ?2;",
            params![resource.to_string(), from, to],
        )?;
        Ok(changed > 0)
    }
}

fn parse_uuid(value: &str) -> RepoResult<ResourceId> {
    Uuid::parse_str(value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{value}` in resource_categories.resource_uuid"
        ))
    })
}

fn parse_field_value(key: &str, text: &str) -> RepoResult<FieldValue> {
    let value: Value = serde_json::from_str(text).map_err(|err| {
        RepoError::InvalidData(format!("field `{key}` is not valid JSON: {err}"))
    })?;
    FieldValue::from_submitted(&value).ok_or_else(|| {
        RepoError::InvalidData(format!("field `{key}` holds an unsupported structure"))
    })
}
