//! Generic category records shared by containers and sites.

use once_cell::sync::Lazy;
use regex::Regex;

/// Store-assigned category identifier.
pub type CategoryId = i64;

/// Taxonomy holding container categories.
pub const CONTAINER_TAXONOMY: &str = "ldp_container";
/// Taxonomy holding registered remote sites.
pub const SITE_TAXONOMY: &str = "ldp_site";

const FALLBACK_SLUG: &str = "term";

static NON_SLUG_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Persisted category record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub taxonomy: String,
    /// Display label.
    pub name: String,
    /// Unique within `taxonomy`.
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub description: String,
}

/// Input for category creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCategory {
    pub taxonomy: String,
    pub name: String,
    /// Derived from `name` when absent.
    pub slug: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub description: String,
}

/// Partial category update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Option<CategoryId>>,
}

/// Normalizes free text into a lowercase, dash-separated slug.
///
/// Returns `"term"` when nothing slug-worthy remains.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let dashed = NON_SLUG_CHARS_RE.replace_all(&lowered, "-");
    let trimmed = dashed.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("example.org /api/ldp/"), "example-org-api-ldp");
        assert_eq!(slugify("  Good or Service "), "good-or-service");
    }

    #[test]
    fn slugify_falls_back_for_symbol_only_input() {
        assert_eq!(slugify("///"), "term");
    }
}
