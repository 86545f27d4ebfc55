//! Remote platform sites discovered in resource field values.

use crate::model::category::CategoryId;

/// Category metadata key holding a site's endpoint prefix.
pub const SITE_URL_META_KEY: &str = "site_url";
/// Category metadata key holding the link a site was discovered from.
pub const SITE_DISCOVERED_FROM_META_KEY: &str = "discovered_from";

/// Registered remote site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: CategoryId,
    /// `host path` of the first link seen for this endpoint.
    pub name: String,
    pub slug: String,
    /// Everything up to and including the resource API path segment.
    pub url_prefix: String,
    pub discovered_from: Option<String>,
}
