use uuid::Uuid;
use wpldp_core::db::open_db_in_memory;
use wpldp_core::{
    BuiltinModelSource, ContainerRegistry, LdpSettings, PermalinkResolver, ResourceStore,
    SqliteCategoryRepository, SqliteOptionRepository, SqliteResourceRepository,
};

#[test]
fn template_embeds_placeholder_under_api_path() {
    let conn = open_db_in_memory().unwrap();
    let resources = SqliteResourceRepository::try_new(&conn).unwrap();
    let resolver = PermalinkResolver::new(&resources, "api/ldp/");

    assert_eq!(
        resolver.resource_link_template("http://example.org/", "ada-lovelace"),
        "http://example.org/api/ldp/%ldp_container%/ada-lovelace/"
    );
}

#[test]
fn resolve_substitutes_first_container_slug() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let resources = SqliteResourceRepository::try_new(&conn).unwrap();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);
    registry.bootstrap(true).unwrap();
    let person = registry.container_by_slug("person").unwrap().unwrap();
    let tagged = Uuid::new_v4();
    resources.assign_container(tagged, person.id).unwrap();

    let resolver = PermalinkResolver::new(&resources, "api/ldp/");
    let template = resolver.resource_link_template("http://example.org", "ada");

    assert_eq!(
        resolver.resolve(&template, tagged).unwrap(),
        "http://example.org/api/ldp/person/ada/"
    );
    assert_eq!(
        resolver.resolve(&template, Uuid::new_v4()).unwrap(),
        template
    );
}
