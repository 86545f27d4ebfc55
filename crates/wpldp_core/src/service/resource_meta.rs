//! Schema-driven persistence of resource field values.
//!
//! # Responsibility
//! - Keep only submitted keys declared by the container's model.
//! - Drop empty entries from collection values and register the remote
//!   sites they link to.
//!
//! # Invariants
//! - Unmatched keys are dropped without error.
//! - Only collection values are scanned for resource links; scalar values are
//!   persisted untouched.
//! - A malformed value skips its own key and nothing else.

use crate::config::LdpSettings;
use crate::model::category::{CategoryId, CONTAINER_TAXONOMY};
use crate::model::resource::{FieldValue, ResourceId};
use crate::repo::category_repo::CategoryStore;
use crate::repo::option_repo::OptionStore;
use crate::repo::resource_repo::ResourceStore;
use crate::repo::RepoResult;
use crate::service::container_registry::load_field_catalog;
use crate::service::site_registry::{is_resource_link, SiteRegistry};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;

static FIELD_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]+|[_\-][0-9A-Za-z_\-]+)$").expect("valid suffix regex"));

/// Keys accepted and rejected by one save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub persisted: Vec<String>,
    /// Keys not declared by the container's model.
    pub dropped: Vec<String>,
    /// Declared keys whose value could not be persisted.
    pub malformed: Vec<String>,
}

/// Persists submitted resource fields against a container's model.
pub struct ResourceMetaStore<'a, C: ?Sized, O: ?Sized, R: ?Sized> {
    settings: &'a LdpSettings,
    categories: &'a C,
    options: &'a O,
    resources: &'a R,
}

impl<'a, C, O, R> ResourceMetaStore<'a, C, O, R>
where
    C: CategoryStore + ?Sized,
    O: OptionStore + ?Sized,
    R: ResourceStore + ?Sized,
{
    pub fn new(
        settings: &'a LdpSettings,
        categories: &'a C,
        options: &'a O,
        resources: &'a R,
    ) -> Self {
        Self {
            settings,
            categories,
            options,
            resources,
        }
    }

    /// Saves `submitted` for `resource_id` against container `container_id`.
    ///
    /// # Errors
    /// - Propagates store failures; keys saved before the failure stay saved.
    pub fn save(
        &self,
        resource_id: ResourceId,
        container_id: CategoryId,
        submitted: &BTreeMap<String, Value>,
    ) -> RepoResult<SaveOutcome> {
        let started_at = Instant::now();
        let catalog = load_field_catalog(self.options, container_id)?;
        let sites = SiteRegistry::new(self.categories, self.settings.api_path.as_str());
        let mut outcome = SaveOutcome::default();

        for (key, raw_value) in submitted {
            if !catalog.iter().any(|field| field_matches(field, key)) {
                outcome.dropped.push(key.clone());
                continue;
            }

            let Some(value) = FieldValue::from_submitted(raw_value) else {
                warn!(
                    "event=resource_save module=resource_meta status=skip key={} reason=malformed_value",
                    key
                );
                outcome.malformed.push(key.clone());
                continue;
            };

            let value = match value {
                FieldValue::Sequence(items) => {
                    let kept: Vec<String> =
                        items.into_iter().filter(|item| !item.is_empty()).collect();
                    for item in &kept {
                        if is_resource_link(item, &self.settings.api_path) {
                            sites.ensure_site(item)?;
                        }
                    }
                    FieldValue::Sequence(kept)
                }
                scalar => scalar,
            };

            self.resources.set_field_value(resource_id, key, &value)?;
            outcome.persisted.push(key.clone());
        }

        info!(
            "event=resource_save module=resource_meta status=ok resource={} persisted={} dropped={} malformed={} duration_ms={}",
            resource_id,
            outcome.persisted.len(),
            outcome.dropped.len(),
            outcome.malformed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(outcome)
    }

    /// Saves against the resource's first assigned container.
    ///
    /// A resource without a container persists nothing.
    pub fn save_for_resource(
        &self,
        resource_id: ResourceId,
        submitted: &BTreeMap<String, Value>,
    ) -> RepoResult<SaveOutcome> {
        let containers = self
            .resources
            .resource_categories(resource_id, CONTAINER_TAXONOMY)?;
        match containers.first() {
            Some(container) => self.save(resource_id, container.id, submitted),
            None => {
                debug!(
                    "event=resource_save module=resource_meta status=skip resource={} reason=no_container",
                    resource_id
                );
                Ok(SaveOutcome {
                    dropped: submitted.keys().cloned().collect(),
                    ..SaveOutcome::default()
                })
            }
        }
    }
}

/// Whether submitted `key` belongs to declared field `field`.
///
/// Matches the exact name, or the name followed by a numeric index or a
/// `_`/`-` group suffix (`skills0`, `skills_2`, `address-home`).
pub fn field_matches(field: &str, key: &str) -> bool {
    if field.is_empty() {
        return false;
    }
    match key.strip_prefix(field) {
        Some("") => true,
        Some(suffix) => FIELD_SUFFIX_RE.is_match(suffix),
        None => false,
    }
}
