//! Category store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over categories of any taxonomy plus per-category metadata.
//! - Own slug allocation and the delete-with-reassignment semantics.
//!
//! # Invariants
//! - `(taxonomy, slug)` is unique; creation never fails on a taken slug, it
//!   allocates `slug-2`, `slug-3`, ...
//! - Deleting a category detaches it from every resource, re-parents its
//!   children and, when asked, tags orphaned resources with a successor.

use crate::model::category::{slugify, Category, CategoryId, CategoryUpdate, NewCategory};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    taxonomy,
    name,
    slug,
    parent_id,
    description
FROM categories";

/// Repository interface for the category store.
pub trait CategoryStore {
    fn create_category(&self, category: &NewCategory) -> RepoResult<Category>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn get_category_by_slug(&self, taxonomy: &str, slug: &str) -> RepoResult<Option<Category>>;
    /// Lists all categories of one taxonomy ordered by id.
    fn list_categories(&self, taxonomy: &str) -> RepoResult<Vec<Category>>;
    fn update_category(&self, id: CategoryId, update: &CategoryUpdate) -> RepoResult<Category>;
    /// Deletes one category.
    ///
    /// Resources tagged with it lose the tag. When `reassign_to` is set, every
    /// such resource left without a category of the same taxonomy is tagged
    /// with `reassign_to` instead.
    fn delete_category(&self, id: CategoryId, reassign_to: Option<CategoryId>) -> RepoResult<()>;
    fn get_category_meta(&self, id: CategoryId, key: &str) -> RepoResult<Option<String>>;
    fn set_category_meta(&self, id: CategoryId, key: &str, value: &str) -> RepoResult<()>;
    /// Finds categories whose metadata `key` contains `needle` as a substring.
    fn find_categories_by_meta(
        &self,
        taxonomy: &str,
        key: &str,
        needle: &str,
    ) -> RepoResult<Vec<Category>>;
}

/// SQLite-backed category store.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["categories", "category_meta", "resource_categories"])?;
        Ok(Self { conn })
    }
}

impl CategoryStore for SqliteCategoryRepository<'_> {
    fn create_category(&self, category: &NewCategory) -> RepoResult<Category> {
        let name = category.name.trim();
        if name.is_empty() {
            return Err(RepoError::InvalidData(
                "category name cannot be empty".to_string(),
            ));
        }

        let base_slug = match category.slug.as_deref() {
            Some(slug) => slugify(slug),
            None => slugify(name),
        };
        let slug = unique_slug(self.conn, &category.taxonomy, &base_slug)?;

        self.conn.execute(
            "INSERT INTO categories (
                taxonomy,
                name,
                slug,
                parent_id,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                category.taxonomy.as_str(),
                name,
                slug.as_str(),
                category.parent_id,
                category.description.as_str(),
            ],
        )?;

        load_required_category(self.conn, self.conn.last_insert_rowid())
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        load_category(self.conn, id)
    }

    fn get_category_by_slug(&self, taxonomy: &str, slug: &str) -> RepoResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                &format!("{CATEGORY_SELECT_SQL} WHERE taxonomy = ?1 AND slug = ?2;"),
                params![taxonomy, slug],
                parse_category_row,
            )
            .optional()?;
        Ok(category)
    }

    fn list_categories(&self, taxonomy: &str) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_SELECT_SQL} WHERE taxonomy = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([taxonomy])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn update_category(&self, id: CategoryId, update: &CategoryUpdate) -> RepoResult<Category> {
        let existing = load_category(self.conn, id)?
            .ok_or_else(|| RepoError::NotFound(format!("category {id}")))?;

        let name = match update.name.as_deref().map(str::trim) {
            Some("") => {
                return Err(RepoError::InvalidData(
                    "category name cannot be empty".to_string(),
                ))
            }
            Some(name) => name.to_string(),
            None => existing.name.clone(),
        };
        let slug = match update.slug.as_deref().map(slugify) {
            Some(slug) if slug != existing.slug => {
                unique_slug(self.conn, &existing.taxonomy, &slug)?
            }
            _ => existing.slug.clone(),
        };
        let description = update
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone());
        let parent_id = update.parent_id.unwrap_or(existing.parent_id);

        self.conn.execute(
            "UPDATE categories
             SET
                name = ?2,
                slug = ?3,
                description = ?4,
                parent_id = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, name, slug, description, parent_id],
        )?;

        load_required_category(self.conn, id)
    }

    fn delete_category(&self, id: CategoryId, reassign_to: Option<CategoryId>) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let category = load_category(&tx, id)?
            .ok_or_else(|| RepoError::NotFound(format!("category {id}")))?;

        let successor = match reassign_to {
            Some(target) if target != id => load_category(&tx, target)?
                .filter(|target| target.taxonomy == category.taxonomy)
                .map(|target| target.id),
            _ => None,
        };

        tx.execute(
            "UPDATE categories SET parent_id = ?2 WHERE parent_id = ?1;",
            params![id, category.parent_id],
        )?;

        let affected = {
            let mut stmt = tx.prepare(
                "SELECT resource_uuid FROM resource_categories WHERE category_id = ?1;",
            )?;
            let rows = stmt.query_map([id], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        tx.execute(
            "DELETE FROM resource_categories WHERE category_id = ?1;",
            [id],
        )?;

        if let Some(successor_id) = successor {
            for resource_uuid in &affected {
                let still_tagged: i64 = tx.query_row(
                    "SELECT EXISTS(
                        SELECT 1
                        FROM resource_categories rc
                        INNER JOIN categories c ON c.id = rc.category_id
                        WHERE rc.resource_uuid = ?1
                          AND c.taxonomy = ?2
                    );",
                    params![resource_uuid, category.taxonomy],
                    |row| row.get(0),
                )?;
                if still_tagged == 0 {
                    tx.execute(
                        "INSERT OR IGNORE INTO resource_categories
                            (resource_uuid, category_id, position)
                         VALUES (?1, ?2, 0);",
                        params![resource_uuid, successor_id],
                    )?;
                }
            }
        }

        tx.execute("DELETE FROM category_meta WHERE category_id = ?1;", [id])?;
        tx.execute("DELETE FROM categories WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(())
    }

    fn get_category_meta(&self, id: CategoryId, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT meta_value FROM category_meta WHERE category_id = ?1 AND meta_key = ?2;",
                params![id, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_category_meta(&self, id: CategoryId, key: &str, value: &str) -> RepoResult<()> {
        if load_category(self.conn, id)?.is_none() {
            return Err(RepoError::NotFound(format!("category {id}")));
        }

        self.conn.execute(
            "INSERT INTO category_meta (category_id, meta_key, meta_value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (category_id, meta_key)
             DO UPDATE SET meta_value = excluded.meta_value;",
            params![id, key, value],
        )?;
        Ok(())
    }

    fn find_categories_by_meta(
        &self,
        taxonomy: &str,
        key: &str,
        needle: &str,
    ) -> RepoResult<Vec<Category>> {
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                c.id AS id,
                c.taxonomy AS taxonomy,
                c.name AS name,
                c.slug AS slug,
                c.parent_id AS parent_id,
                c.description AS description
             FROM categories c
             INNER JOIN category_meta m ON m.category_id = c.id
             WHERE c.taxonomy = ?1
               AND m.meta_key = ?2
               AND instr(m.meta_value, ?3) > 0
             ORDER BY c.id ASC;",
        )?;
        let mut rows = stmt.query(params![taxonomy, key, needle])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }
}

fn load_category(conn: &Connection, id: CategoryId) -> RepoResult<Option<Category>> {
    let category = conn
        .query_row(
            &format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"),
            [id],
            parse_category_row,
        )
        .optional()?;
    Ok(category)
}

fn load_required_category(conn: &Connection, id: CategoryId) -> RepoResult<Category> {
    load_category(conn, id)?.ok_or_else(|| RepoError::NotFound(format!("category {id}")))
}

fn unique_slug(conn: &Connection, taxonomy: &str, base: &str) -> RepoResult<String> {
    let mut candidate = base.to_string();
    let mut suffix = 2_u32;
    loop {
        let taken: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE taxonomy = ?1 AND slug = ?2);",
            params![taxonomy, candidate],
            |row| row.get(0),
        )?;
        if taken == 0 {
            return Ok(candidate);
        }
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
}

fn parse_category_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        taxonomy: row.get("taxonomy")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        parent_id: row.get("parent_id")?,
        description: row.get("description")?,
    })
}
