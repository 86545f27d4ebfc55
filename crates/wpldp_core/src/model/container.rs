//! Container catalog, persisted container metadata and model documents.
//!
//! # Responsibility
//! - Declare the closed catalog of container slugs with their RDF types.
//! - Define the `container_<id>` metadata record shape.
//! - Parse model documents into a flat field catalog.
//!
//! # Invariants
//! - Catalog slugs are unique and never created by users.
//! - Model text is stored raw; it is only parsed when read.
//! - Parsing a model document never fails on a malformed group or field;
//!   those entries are skipped.

use crate::model::category::CategoryId;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Key-value store key prefix for container metadata records.
pub const CONTAINER_META_PREFIX: &str = "container_";

/// Model served to the edit form when a container has no usable model.
pub const FALLBACK_FORM_MODEL: &str = r#"{"people":{"fields":[{"title":"What's your name?","name":"name"},{"title":"Who are you?","name":"description"}]}}"#;

/// One entry of the fixed container catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub slug: &'static str,
    pub label: &'static str,
    /// Compact IRI of the RDF class, e.g. `foaf:group`.
    pub rdf_type: &'static str,
}

/// The fixed container catalog.
pub const CONTAINER_CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        slug: "initiative",
        label: "Initiative",
        rdf_type: "pair:initiative",
    },
    CatalogEntry {
        slug: "organization",
        label: "Organization",
        rdf_type: "foaf:organization",
    },
    CatalogEntry {
        slug: "group",
        label: "Group",
        rdf_type: "foaf:group",
    },
    CatalogEntry {
        slug: "document",
        label: "Document",
        rdf_type: "foaf:document",
    },
    CatalogEntry {
        slug: "goodorservice",
        label: "Good or Service",
        rdf_type: "goodRelation:goodOrService",
    },
    CatalogEntry {
        slug: "artwork",
        label: "Artwork",
        rdf_type: "schema:artwork",
    },
    CatalogEntry {
        slug: "event",
        label: "Event",
        rdf_type: "schema:event",
    },
    CatalogEntry {
        slug: "place",
        label: "Place",
        rdf_type: "schema:place",
    },
    CatalogEntry {
        slug: "theme",
        label: "Theme",
        rdf_type: "pair:theme",
    },
    CatalogEntry {
        slug: "thesis",
        label: "Thesis",
        rdf_type: "pair:thesis",
    },
    CatalogEntry {
        slug: "person",
        label: "Person",
        rdf_type: "pair:person",
    },
];

/// Looks up a catalog entry by slug.
pub fn catalog_entry(slug: &str) -> Option<&'static CatalogEntry> {
    CONTAINER_CATALOG.iter().find(|entry| entry.slug == slug)
}

/// Category description written for every catalog container.
pub fn container_description(slug: &str) -> String {
    format!("The {slug} object model")
}

/// Key-value store key holding metadata for container `id`.
pub fn container_meta_key(id: CategoryId) -> String {
    format!("{CONTAINER_META_PREFIX}{id}")
}

/// Persisted container metadata record.
///
/// Fields this crate does not own are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContainerMeta {
    #[serde(default)]
    pub rdf_type: Option<String>,
    /// Raw JSON text of the model document. `None` when no model was found.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub included_fields_list: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerMeta {
    /// Reads a record from its stored value. Returns `None` for non-object or
    /// mistyped values.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Container read model combining the category and its metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: CategoryId,
    pub slug: String,
    pub label: String,
    pub description: String,
    pub rdf_type: Option<String>,
    pub model: Option<String>,
}

/// One declared field of a model document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldDefinition {
    #[serde(default)]
    pub title: String,
    /// Persistence key for the field value.
    pub name: String,
}

/// A named group of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

/// Parsed model document: `{ "<group>": { "fields": [ { "title", "name" } ] } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDocument {
    groups: Vec<FieldGroup>,
}

impl ModelDocument {
    /// Parses model text.
    ///
    /// # Errors
    /// - Returns the JSON error when `text` is not JSON at all.
    ///
    /// A JSON value that is not an object yields an empty document.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// Builds a document from an already-decoded value, skipping malformed
    /// groups and fields.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let groups = object
            .iter()
            .filter_map(|(group_name, group)| {
                let fields = group.get("fields")?.as_array()?;
                let fields = fields
                    .iter()
                    .filter_map(|field| {
                        serde_json::from_value::<FieldDefinition>(field.clone()).ok()
                    })
                    .collect();
                Some(FieldGroup {
                    name: group_name.clone(),
                    fields,
                })
            })
            .collect();

        Self { groups }
    }

    pub fn groups(&self) -> &[FieldGroup] {
        &self.groups
    }

    /// Flattens every group into the list of declared field names.
    pub fn field_names(&self) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|group| group.fields.iter())
            .map(|field| field.name.clone())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{catalog_entry, ContainerMeta, ModelDocument, CONTAINER_CATALOG};
    use serde_json::json;
    use std::collections::BTreeSet;

    #[test]
    fn catalog_slugs_are_unique() {
        let slugs: BTreeSet<_> = CONTAINER_CATALOG.iter().map(|entry| entry.slug).collect();
        assert_eq!(slugs.len(), CONTAINER_CATALOG.len());
        assert_eq!(
            catalog_entry("person").map(|entry| entry.rdf_type),
            Some("pair:person")
        );
    }

    #[test]
    fn model_document_flattens_groups_and_skips_malformed_entries() {
        let doc = ModelDocument::parse(
            r#"{
                "identity": {"fields": [{"title": "Name", "name": "name"}, {"title": "no name"}]},
                "broken": ["not", "a", "group"],
                "links": {"fields": [{"title": "Sites", "name": "sites"}]}
            }"#,
        )
        .expect("valid JSON");

        let mut names = doc.field_names();
        names.sort();
        assert_eq!(names, vec!["name".to_string(), "sites".to_string()]);
        assert_eq!(doc.groups().len(), 2);
    }

    #[test]
    fn non_object_model_is_empty() {
        let doc = ModelDocument::parse("[1, 2]").expect("valid JSON");
        assert!(doc.field_names().is_empty());
        assert!(ModelDocument::parse("{not json").is_err());
    }

    #[test]
    fn container_meta_keeps_unknown_fields() {
        let meta = ContainerMeta::from_value(json!({
            "rdf_type": "foaf:group",
            "model": null,
            "included_fields_list": "name,description",
            "owner": "admin"
        }))
        .expect("object record");
        assert_eq!(meta.rdf_type.as_deref(), Some("foaf:group"));
        assert!(meta.model.is_none());
        assert_eq!(meta.included_fields_list.as_deref(), Some("name,description"));
        assert_eq!(meta.extra.get("owner"), Some(&json!("admin")));
        assert!(ContainerMeta::from_value(json!("scalar")).is_none());
    }
}
