//! One-directional data-model migration driven by the version marker.
//!
//! # Responsibility
//! - Compare the stored version marker against the build's target version.
//! - On upgrade: force a container reinit, consolidate deprecated containers,
//!   strip the legacy key prefix, purge transient entries.
//! - Rewrite the version marker on every check.
//!
//! # Invariants
//! - Versions compare as plain strings, not as semantic versions.
//! - `stored >= target` skips every step except the marker write.
//! - Within a step, an unreadable or vanished record is skipped; only store
//!   failures abort the check.
//! - The marker read and write are not atomic; concurrent checks may both run
//!   the steps, which are idempotent.

use crate::config::{LdpSettings, VERSION_MARKER_KEY};
use crate::model::category::{CategoryId, CONTAINER_TAXONOMY};
use crate::model::container::CONTAINER_META_PREFIX;
use crate::model_source::ModelSource;
use crate::repo::category_repo::CategoryStore;
use crate::repo::option_repo::OptionStore;
use crate::repo::resource_repo::ResourceStore;
use crate::repo::{RepoError, RepoResult};
use crate::service::container_registry::ContainerRegistry;
use log::{debug, info, warn};
use serde_json::Value;
use std::time::Instant;

/// Container record fields that may embed legacy-prefixed field names.
const PREFIXED_RECORD_FIELDS: &[&str] = &["model", "included_fields_list"];

/// What one update check did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    pub stored_version: String,
    pub target_version: String,
    /// Whether steps after the version gate ran.
    pub applied: bool,
    pub reinitialized: bool,
    /// Deprecated slugs whose category was deleted.
    pub consolidated: Vec<String>,
    pub renamed_field_keys: usize,
    pub rewritten_container_records: usize,
    /// Records skipped because they were unreadable or vanished mid-step.
    pub skipped_records: usize,
    pub purged_entries: usize,
}

/// Drives the data-model migration.
pub struct MigrationEngine<'a, C: ?Sized, O: ?Sized, R: ?Sized, M: ?Sized> {
    settings: &'a LdpSettings,
    categories: &'a C,
    options: &'a O,
    resources: &'a R,
    models: &'a M,
}

impl<'a, C, O, R, M> MigrationEngine<'a, C, O, R, M>
where
    C: CategoryStore + ?Sized,
    O: OptionStore + ?Sized,
    R: ResourceStore + ?Sized,
    M: ModelSource + ?Sized,
{
    pub fn new(
        settings: &'a LdpSettings,
        categories: &'a C,
        options: &'a O,
        resources: &'a R,
        models: &'a M,
    ) -> Self {
        Self {
            settings,
            categories,
            options,
            resources,
            models,
        }
    }

    /// Reads the stored marker and upgrades to the configured target.
    ///
    /// A missing marker reads as the empty string.
    pub fn check_for_update(&self) -> RepoResult<UpgradeReport> {
        let stored = match self.options.get_string_option(VERSION_MARKER_KEY) {
            Ok(stored) => stored.unwrap_or_default(),
            Err(err) if err.is_record_level() => {
                warn!(
                    "event=version_check module=migration status=skip reason=unreadable_marker error={}",
                    err
                );
                String::new()
            }
            Err(err) => return Err(err),
        };
        self.upgrade(&stored, &self.settings.target_version)
    }

    /// Migrates from `stored_version` to `target_version`, then rewrites the
    /// marker to `target_version` unconditionally.
    ///
    /// # Errors
    /// - Propagates store failures, leaving earlier steps applied and the
    ///   marker unchanged.
    pub fn upgrade(
        &self,
        stored_version: &str,
        target_version: &str,
    ) -> RepoResult<UpgradeReport> {
        let started_at = Instant::now();
        let mut report = UpgradeReport {
            stored_version: stored_version.to_string(),
            target_version: target_version.to_string(),
            ..UpgradeReport::default()
        };

        if stored_version >= target_version {
            debug!(
                "event=version_check module=migration status=skip stored={} target={}",
                stored_version, target_version
            );
        } else {
            info!(
                "event=upgrade module=migration status=start stored={} target={}",
                stored_version, target_version
            );
            report.applied = true;

            if target_version >= self.settings.reinit_threshold.as_str() {
                ContainerRegistry::new(self.settings, self.categories, self.options, self.models)
                    .bootstrap(true)?;
                report.reinitialized = true;
            }
            self.consolidate_containers(&mut report)?;
            self.strip_legacy_prefix(&mut report)?;
            self.purge_transients(&mut report)?;
        }

        self.options
            .set_option(VERSION_MARKER_KEY, &Value::String(target_version.to_string()))?;

        if report.applied {
            info!(
                "event=upgrade module=migration status=ok target={} consolidated={} renamed_keys={} rewritten_records={} skipped_records={} purged={} duration_ms={}",
                target_version,
                report.consolidated.len(),
                report.renamed_field_keys,
                report.rewritten_container_records,
                report.skipped_records,
                report.purged_entries,
                started_at.elapsed().as_millis()
            );
        }
        Ok(report)
    }

    fn consolidate_containers(&self, report: &mut UpgradeReport) -> RepoResult<()> {
        for deprecated in &self.settings.deprecated_containers {
            let Some(category) = self
                .categories
                .get_category_by_slug(CONTAINER_TAXONOMY, &deprecated.slug)?
            else {
                continue;
            };

            let successor = match deprecated.successor.as_deref() {
                Some(slug) => {
                    let found = self
                        .categories
                        .get_category_by_slug(CONTAINER_TAXONOMY, slug)?;
                    if found.is_none() {
                        warn!(
                            "event=consolidate module=migration status=skip slug={} successor={} reason=successor_missing",
                            deprecated.slug, slug
                        );
                    }
                    found.map(|category| category.id)
                }
                None => None,
            };

            match self.categories.delete_category(category.id, successor) {
                Ok(()) => report.consolidated.push(deprecated.slug.clone()),
                Err(err) if err.is_record_level() => {
                    warn!(
                        "event=consolidate module=migration status=skip slug={} error={}",
                        deprecated.slug, err
                    );
                    report.skipped_records += 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn strip_legacy_prefix(&self, report: &mut UpgradeReport) -> RepoResult<()> {
        let prefix = self.settings.legacy_prefix.as_str();
        if prefix.is_empty() {
            return Ok(());
        }

        for (resource, key) in self.resources.field_keys_with_prefix(prefix)? {
            let Some(stripped) = key.strip_prefix(prefix).filter(|rest| !rest.is_empty()) else {
                continue;
            };
            match self.resources.rename_field_key(resource, &key, stripped) {
                Ok(true) => report.renamed_field_keys += 1,
                Ok(false) => {}
                Err(err) => skip_record_level(err, report, &key)?,
            }
        }

        for name in self.options.option_names_with_prefix(CONTAINER_META_PREFIX)? {
            if !is_container_record_key(&name) {
                continue;
            }
            let mut record = match self.options.get_option(&name) {
                Ok(Some(Value::Object(record))) => record,
                Ok(Some(_)) => {
                    warn!(
                        "event=strip_prefix module=migration status=skip key={} reason=not_an_object",
                        name
                    );
                    report.skipped_records += 1;
                    continue;
                }
                Ok(None) => continue,
                Err(err) => {
                    skip_record_level(err, report, &name)?;
                    continue;
                }
            };

            let mut changed = false;
            for field in PREFIXED_RECORD_FIELDS {
                if let Some(Value::String(text)) = record.get_mut(*field) {
                    if text.contains(prefix) {
                        *text = text.replace(prefix, "");
                        changed = true;
                    }
                }
            }
            if changed {
                self.options.set_option(&name, &Value::Object(record))?;
                report.rewritten_container_records += 1;
            }
        }
        Ok(())
    }

    fn purge_transients(&self, report: &mut UpgradeReport) -> RepoResult<()> {
        self.options.flush_cache();
        let marker = self.settings.transient_marker.as_str();
        if !marker.is_empty() {
            for name in self.options.option_names_containing(marker)? {
                if self.options.delete_option(&name)? {
                    report.purged_entries += 1;
                }
            }
        }
        self.options.flush_cache();
        Ok(())
    }
}

/// `container_<id>` keys only; other option names share the prefix.
fn is_container_record_key(name: &str) -> bool {
    name.strip_prefix(CONTAINER_META_PREFIX)
        .is_some_and(|id| id.parse::<CategoryId>().is_ok())
}

fn skip_record_level(err: RepoError, report: &mut UpgradeReport, key: &str) -> RepoResult<()> {
    if !err.is_record_level() {
        return Err(err);
    }
    warn!(
        "event=strip_prefix module=migration status=skip key={} error={}",
        key, err
    );
    report.skipped_records += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::is_container_record_key;

    #[test]
    fn container_record_keys_need_numeric_id() {
        assert!(is_container_record_key("container_12"));
        assert!(!is_container_record_key("container_init"));
        assert!(!is_container_record_key("container_"));
    }
}
