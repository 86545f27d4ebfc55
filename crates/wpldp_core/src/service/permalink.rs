//! Resource permalink templating and container slug substitution.

use crate::model::category::CONTAINER_TAXONOMY;
use crate::model::resource::ResourceId;
use crate::repo::resource_repo::ResourceStore;
use crate::repo::RepoResult;

/// Placeholder substituted with the resource's container slug.
pub const CONTAINER_PLACEHOLDER: &str = "%ldp_container%";

/// Builds and resolves resource permalinks.
pub struct PermalinkResolver<'a, R: ?Sized> {
    resources: &'a R,
    api_path: &'a str,
}

impl<'a, R> PermalinkResolver<'a, R>
where
    R: ResourceStore + ?Sized,
{
    pub fn new(resources: &'a R, api_path: &'a str) -> Self {
        Self {
            resources,
            api_path,
        }
    }

    /// `<home>/<api_path>%ldp_container%/<resource_slug>/`
    pub fn resource_link_template(&self, home_url: &str, resource_slug: &str) -> String {
        format!(
            "{}/{}{}/{}/",
            home_url.trim_end_matches('/'),
            self.api_path.trim_start_matches('/'),
            CONTAINER_PLACEHOLDER,
            resource_slug.trim_matches('/')
        )
    }

    /// Substitutes the placeholder with the slug of the resource's first
    /// container. Links of resources without a container are returned as-is.
    pub fn resolve(&self, link: &str, resource_id: ResourceId) -> RepoResult<String> {
        let containers = self
            .resources
            .resource_categories(resource_id, CONTAINER_TAXONOMY)?;
        Ok(match containers.first() {
            Some(container) => link.replace(CONTAINER_PLACEHOLDER, &container.slug),
            None => link.to_string(),
        })
    }
}
