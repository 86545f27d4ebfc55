//! Model-definition sources keyed by container slug.
//!
//! # Invariants
//! - Loading never fails loudly: a missing or unreadable document is `None`.
//! - Returned text is raw; callers decide whether and when to parse it.

use log::warn;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Supplies the raw model document for a container slug.
pub trait ModelSource {
    fn load_model(&self, slug: &str) -> Option<String>;
}

/// Reads `<root>/<slug>.json` from disk.
#[derive(Debug, Clone)]
pub struct DirectoryModelSource {
    root: PathBuf,
}

impl DirectoryModelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ModelSource for DirectoryModelSource {
    fn load_model(&self, slug: &str) -> Option<String> {
        if slug.is_empty() || slug.contains(['/', '\\', '.']) {
            return None;
        }
        let path = self.root.join(format!("{slug}.json"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(
                    "event=model_load module=models status=skip slug={} path={} error={}",
                    slug,
                    path.display(),
                    err
                );
                None
            }
        }
    }
}

/// Model documents compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinModelSource;

const BUILTIN_MODELS: &[(&str, &str)] = &[
    ("initiative", include_str!("../models/initiative.json")),
    ("organization", include_str!("../models/organization.json")),
    ("group", include_str!("../models/group.json")),
    ("document", include_str!("../models/document.json")),
    ("goodorservice", include_str!("../models/goodorservice.json")),
    ("artwork", include_str!("../models/artwork.json")),
    ("event", include_str!("../models/event.json")),
    ("place", include_str!("../models/place.json")),
    ("theme", include_str!("../models/theme.json")),
    ("thesis", include_str!("../models/thesis.json")),
    ("person", include_str!("../models/person.json")),
];

impl ModelSource for BuiltinModelSource {
    fn load_model(&self, slug: &str) -> Option<String> {
        BUILTIN_MODELS
            .iter()
            .find(|(name, _)| *name == slug)
            .map(|(_, text)| (*text).to_string())
    }
}

impl ModelSource for BTreeMap<String, String> {
    fn load_model(&self, slug: &str) -> Option<String> {
        self.get(slug).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::{BuiltinModelSource, DirectoryModelSource, ModelSource};
    use crate::model::container::{ModelDocument, CONTAINER_CATALOG};

    #[test]
    fn every_catalog_slug_has_a_builtin_model() {
        for entry in CONTAINER_CATALOG {
            let text = BuiltinModelSource
                .load_model(entry.slug)
                .unwrap_or_else(|| panic!("missing builtin model for {}", entry.slug));
            let doc = ModelDocument::parse(&text).expect("builtin model is JSON");
            assert!(!doc.field_names().is_empty(), "{} has no fields", entry.slug);
        }
    }

    #[test]
    fn directory_source_reads_files_and_tolerates_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("group.json"), r#"{"g":{"fields":[]}}"#).unwrap();
        let source = DirectoryModelSource::new(dir.path());

        assert_eq!(
            source.load_model("group").as_deref(),
            Some(r#"{"g":{"fields":[]}}"#)
        );
        assert!(source.load_model("person").is_none());
        assert!(source.load_model("../group").is_none());
    }
}
