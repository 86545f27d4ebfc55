//! Container catalog bootstrap and container read-back.
//!
//! # Responsibility
//! - Upsert every catalog container into the category store.
//! - Write each container's `rdf_type` and raw `model` into its
//!   `container_<id>` record in the option store.
//! - Serve containers, field catalogs and form models back to the host.
//!
//! # Invariants
//! - Bootstrap never creates a second category for a catalog slug.
//! - Bootstrap only touches `rdf_type` and `model` inside a record; other
//!   fields survive.
//! - A missing model document stores `model: null` and does not stop the
//!   remaining containers.

use crate::config::{LdpSettings, CONTAINER_INIT_FLAG_KEY, CONTEXT_URL_KEY};
use crate::model::category::{
    Category, CategoryId, CategoryUpdate, NewCategory, CONTAINER_TAXONOMY,
};
use crate::model::container::{
    container_description, container_meta_key, CatalogEntry, Container, ContainerMeta,
    ModelDocument, CONTAINER_CATALOG, FALLBACK_FORM_MODEL,
};
use crate::model_source::ModelSource;
use crate::repo::category_repo::CategoryStore;
use crate::repo::option_repo::OptionStore;
use crate::repo::RepoResult;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::time::Instant;

/// Bootstraps and reads back the container catalog.
pub struct ContainerRegistry<'a, C: ?Sized, O: ?Sized, M: ?Sized> {
    settings: &'a LdpSettings,
    categories: &'a C,
    options: &'a O,
    models: &'a M,
}

impl<'a, C, O, M> ContainerRegistry<'a, C, O, M>
where
    C: CategoryStore + ?Sized,
    O: OptionStore + ?Sized,
    M: ModelSource + ?Sized,
{
    pub fn new(
        settings: &'a LdpSettings,
        categories: &'a C,
        options: &'a O,
        models: &'a M,
    ) -> Self {
        Self {
            settings,
            categories,
            options,
            models,
        }
    }

    /// Upserts every catalog container when the init flag is set or `force`
    /// is true. Otherwise does nothing.
    ///
    /// # Errors
    /// - Propagates store failures; nothing already written is rolled back.
    pub fn bootstrap(&self, force: bool) -> RepoResult<()> {
        if !force && !self.options.get_flag_option(CONTAINER_INIT_FLAG_KEY)? {
            debug!("event=container_bootstrap module=registry status=skip reason=flag_unset");
            return Ok(());
        }

        let started_at = Instant::now();
        info!("event=container_bootstrap module=registry status=start force={force}");

        for entry in CONTAINER_CATALOG {
            self.upsert_container(entry)?;
        }

        info!(
            "event=container_bootstrap module=registry status=ok containers={} duration_ms={}",
            CONTAINER_CATALOG.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Sets or clears the "initialize containers" flag.
    pub fn set_init_flag(&self, enabled: bool) -> RepoResult<()> {
        self.options
            .set_option(CONTAINER_INIT_FLAG_KEY, &Value::Bool(enabled))
    }

    /// Lists containers, slug descending.
    pub fn list_containers(&self) -> RepoResult<Vec<Container>> {
        let mut categories = self.categories.list_categories(CONTAINER_TAXONOMY)?;
        categories.sort_by(|left, right| right.slug.cmp(&left.slug));
        categories
            .into_iter()
            .map(|category| self.to_container(category))
            .collect()
    }

    pub fn container(&self, id: CategoryId) -> RepoResult<Option<Container>> {
        match self.categories.get_category(id)? {
            Some(category) if category.taxonomy == CONTAINER_TAXONOMY => {
                self.to_container(category).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn container_by_slug(&self, slug: &str) -> RepoResult<Option<Container>> {
        self.categories
            .get_category_by_slug(CONTAINER_TAXONOMY, slug)?
            .map(|category| self.to_container(category))
            .transpose()
    }

    /// Declared field names of a container. Empty when it has no usable model.
    pub fn field_catalog(&self, id: CategoryId) -> RepoResult<Vec<String>> {
        load_field_catalog(self.options, id)
    }

    /// Model text the resource edit form renders for a container.
    ///
    /// Falls back to a two-field "people" model when the container has no
    /// record, no model, or an unreadable model.
    pub fn form_model(&self, id: CategoryId) -> RepoResult<String> {
        let model = load_container_meta(self.options, id)?.and_then(|meta| meta.model);
        let compact = model
            .as_deref()
            .and_then(|text| serde_json::from_str::<Value>(text).ok())
            .map(|value| value.to_string());
        Ok(compact.unwrap_or_else(|| FALLBACK_FORM_MODEL.to_string()))
    }

    /// JSON-LD context URL: the stored option, else the configured one.
    pub fn context_url(&self) -> RepoResult<String> {
        Ok(self
            .options
            .get_string_option(CONTEXT_URL_KEY)?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.settings.context_url.clone()))
    }

    fn upsert_container(&self, entry: &CatalogEntry) -> RepoResult<CategoryId> {
        let description = container_description(entry.slug);
        let category = match self
            .categories
            .get_category_by_slug(CONTAINER_TAXONOMY, entry.slug)?
        {
            Some(existing) => self.categories.update_category(
                existing.id,
                &CategoryUpdate {
                    description: Some(description),
                    ..CategoryUpdate::default()
                },
            )?,
            None => self.categories.create_category(&NewCategory {
                taxonomy: CONTAINER_TAXONOMY.to_string(),
                name: entry.label.to_string(),
                slug: Some(entry.slug.to_string()),
                parent_id: None,
                description,
            })?,
        };

        let model = self.models.load_model(entry.slug);
        if model.is_none() {
            warn!(
                "event=container_model module=registry status=skip slug={} reason=model_missing",
                entry.slug
            );
        }

        let key = container_meta_key(category.id);
        let mut record = match self.options.get_option(&key) {
            Ok(Some(Value::Object(record))) => record,
            Ok(_) => Map::new(),
            Err(err) if err.is_record_level() => {
                warn!(
                    "event=container_meta module=registry status=skip key={} error={}",
                    key, err
                );
                Map::new()
            }
            Err(err) => return Err(err),
        };
        record.insert(
            "rdf_type".to_string(),
            Value::String(entry.rdf_type.to_string()),
        );
        record.insert("model".to_string(), model.map_or(Value::Null, Value::String));
        self.options.set_option(&key, &Value::Object(record))?;

        debug!(
            "event=container_upsert module=registry status=ok slug={} id={}",
            entry.slug, category.id
        );
        Ok(category.id)
    }

    fn to_container(&self, category: Category) -> RepoResult<Container> {
        let meta = load_container_meta(self.options, category.id)?.unwrap_or_default();
        Ok(Container {
            id: category.id,
            slug: category.slug,
            label: category.name,
            description: category.description,
            rdf_type: meta.rdf_type,
            model: meta.model,
        })
    }
}

/// Loads a container metadata record. Unreadable records read as `None`.
pub(crate) fn load_container_meta<O>(
    options: &O,
    id: CategoryId,
) -> RepoResult<Option<ContainerMeta>>
where
    O: OptionStore + ?Sized,
{
    match options.get_option(&container_meta_key(id)) {
        Ok(Some(value)) => Ok(ContainerMeta::from_value(value)),
        Ok(None) => Ok(None),
        Err(err) if err.is_record_level() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Flattened field names declared by a container's model document.
pub(crate) fn load_field_catalog<O>(
    options: &O,
    id: CategoryId,
) -> RepoResult<Vec<String>>
where
    O: OptionStore + ?Sized,
{
    let model = load_container_meta(options, id)?.and_then(|meta| meta.model);
    Ok(model
        .and_then(|text| ModelDocument::parse(&text).ok())
        .map(|doc| doc.field_names())
        .unwrap_or_default())
}
