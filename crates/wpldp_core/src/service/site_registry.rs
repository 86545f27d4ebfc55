//! Deduplicating registry of remote platform sites.
//!
//! # Responsibility
//! - Derive an endpoint prefix from a resource link.
//! - Register one site category per previously unseen prefix.
//!
//! # Invariants
//! - `ensure_site` never surfaces link problems to its caller.
//! - Matching is substring-based on the stored prefix. Scheme or trailing
//!   slash variants of one endpoint register as distinct sites.

use crate::model::category::{NewCategory, SITE_TAXONOMY};
use crate::model::site::{Site, SITE_DISCOVERED_FROM_META_KEY, SITE_URL_META_KEY};
use crate::repo::category_repo::CategoryStore;
use crate::repo::RepoResult;
use log::{debug, info, warn};
use url::Url;

/// Registers remote sites discovered in resource links.
pub struct SiteRegistry<'a, C: ?Sized> {
    categories: &'a C,
    api_path: &'a str,
}

impl<'a, C> SiteRegistry<'a, C>
where
    C: CategoryStore + ?Sized,
{
    pub fn new(categories: &'a C, api_path: &'a str) -> Self {
        Self {
            categories,
            api_path,
        }
    }

    /// Registers the endpoint behind `link` unless it is already known.
    ///
    /// Links without the API path segment or that fail URL parsing are
    /// skipped silently.
    ///
    /// # Errors
    /// - Propagates category store failures only.
    pub fn ensure_site(&self, link: &str) -> RepoResult<()> {
        let Some(prefix) = site_prefix(link, self.api_path) else {
            warn!("event=site_register module=sites status=skip reason=no_api_segment");
            return Ok(());
        };

        let known = self
            .categories
            .find_categories_by_meta(SITE_TAXONOMY, SITE_URL_META_KEY, &prefix)?;
        if !known.is_empty() {
            debug!("event=site_register module=sites status=skip reason=known prefix={prefix}");
            return Ok(());
        }

        let Some(name) = site_name(link) else {
            warn!("event=site_register module=sites status=skip reason=unparseable_link");
            return Ok(());
        };

        let site = self.categories.create_category(&NewCategory {
            taxonomy: SITE_TAXONOMY.to_string(),
            name,
            slug: None,
            parent_id: None,
            description: String::new(),
        })?;
        self.categories
            .set_category_meta(site.id, SITE_URL_META_KEY, &prefix)?;
        self.categories
            .set_category_meta(site.id, SITE_DISCOVERED_FROM_META_KEY, link)?;

        info!(
            "event=site_register module=sites status=ok id={} prefix={}",
            site.id, prefix
        );
        Ok(())
    }

    /// Lists registered sites ordered by id. Sites without a stored prefix
    /// are not listed.
    pub fn list_sites(&self) -> RepoResult<Vec<Site>> {
        let mut sites = Vec::new();
        for category in self.categories.list_categories(SITE_TAXONOMY)? {
            let Some(url_prefix) = self
                .categories
                .get_category_meta(category.id, SITE_URL_META_KEY)?
            else {
                continue;
            };
            let discovered_from = self
                .categories
                .get_category_meta(category.id, SITE_DISCOVERED_FROM_META_KEY)?;
            sites.push(Site {
                id: category.id,
                name: category.name,
                slug: category.slug,
                url_prefix,
                discovered_from,
            });
        }
        Ok(sites)
    }
}

/// Everything in `link` before the first `api_path`, plus `api_path` itself.
pub fn site_prefix(link: &str, api_path: &str) -> Option<String> {
    if api_path.is_empty() {
        return None;
    }
    let index = link.find(api_path)?;
    Some(format!("{}{}", &link[..index], api_path))
}

/// Whether a field value looks like a link into another platform's
/// resource API.
pub fn is_resource_link(value: &str, api_path: &str) -> bool {
    !api_path.is_empty()
        && value.contains(api_path)
        && (value.starts_with("http://") || value.starts_with("https://"))
}

fn site_name(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let host = url.host_str()?;
    Some(format!("{host} {}", url.path()))
}

#[cfg(test)]
mod tests {
    use super::{is_resource_link, site_name, site_prefix};

    #[test]
    fn prefix_keeps_everything_up_to_the_api_segment() {
        assert_eq!(
            site_prefix("http://host/api/ldp/resource/1", "api/ldp/").as_deref(),
            Some("http://host/api/ldp/")
        );
        assert!(site_prefix("http://host/other/1", "api/ldp/").is_none());
    }

    #[test]
    fn resource_link_requires_http_scheme_and_segment() {
        assert!(is_resource_link("https://a.org/api/ldp/x", "api/ldp/"));
        assert!(!is_resource_link("ftp://a.org/api/ldp/x", "api/ldp/"));
        assert!(!is_resource_link("plaintext", "api/ldp/"));
    }

    #[test]
    fn site_name_uses_host_and_path() {
        assert_eq!(
            site_name("http://example.org/api/ldp/person/3").as_deref(),
            Some("example.org /api/ldp/person/3")
        );
        assert!(site_name("http://[::1/api/ldp/").is_none());
    }
}
