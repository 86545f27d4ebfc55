use serde_json::{json, Value};
use std::collections::BTreeMap;
use wpldp_core::db::open_db_in_memory;
use wpldp_core::model::container::{container_meta_key, FALLBACK_FORM_MODEL};
use wpldp_core::{
    BuiltinModelSource, CategoryStore, ContainerRegistry, LdpSettings, OptionStore,
    SqliteCategoryRepository, SqliteOptionRepository, CONTAINER_CATALOG, CONTAINER_TAXONOMY,
};

#[test]
fn bootstrap_without_flag_does_nothing() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);

    registry.bootstrap(false).unwrap();

    assert!(categories.list_categories(CONTAINER_TAXONOMY).unwrap().is_empty());
}

#[test]
fn bootstrap_with_flag_creates_catalog() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);

    registry.set_init_flag(true).unwrap();
    registry.bootstrap(false).unwrap();

    let person = registry.container_by_slug("person").unwrap().unwrap();
    assert_eq!(person.label, "Person");
    assert_eq!(person.description, "The person object model");
    assert_eq!(person.rdf_type.as_deref(), Some("pair:person"));
    assert!(registry
        .field_catalog(person.id)
        .unwrap()
        .contains(&"knows".to_string()));
}

#[test]
fn forced_bootstrap_twice_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);

    registry.bootstrap(true).unwrap();
    let first = registry.list_containers().unwrap();
    registry.bootstrap(true).unwrap();
    let second = registry.list_containers().unwrap();

    assert_eq!(first.len(), CONTAINER_CATALOG.len());
    assert_eq!(first, second);
    for entry in CONTAINER_CATALOG {
        let matching = second.iter().filter(|c| c.slug == entry.slug).count();
        assert_eq!(matching, 1, "slug {} duplicated", entry.slug);
    }
}

#[test]
fn containers_are_listed_slug_descending() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);
    registry.bootstrap(true).unwrap();

    let slugs: Vec<String> = registry
        .list_containers()
        .unwrap()
        .into_iter()
        .map(|container| container.slug)
        .collect();

    let mut expected = slugs.clone();
    expected.sort_by(|left, right| right.cmp(left));
    assert_eq!(slugs, expected);
    assert_eq!(slugs.first().map(String::as_str), Some("thesis"));
}

#[test]
fn missing_model_stores_null_and_continues() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let models: BTreeMap<String, String> = CONTAINER_CATALOG
        .iter()
        .filter(|entry| entry.slug != "group")
        .map(|entry| {
            (
                entry.slug.to_string(),
                format!(r#"{{"main":{{"fields":[{{"name":"{}_title"}}]}}}}"#, entry.slug),
            )
        })
        .collect();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &models);

    registry.bootstrap(true).unwrap();

    let group = registry.container_by_slug("group").unwrap().unwrap();
    let record = options.get_option(&container_meta_key(group.id)).unwrap().unwrap();
    assert_eq!(record["model"], Value::Null);
    assert_eq!(record["rdf_type"], json!("foaf:group"));
    assert!(group.model.is_none());

    let place = registry.container_by_slug("place").unwrap().unwrap();
    assert_eq!(registry.field_catalog(place.id).unwrap(), vec!["place_title"]);
    assert_eq!(registry.list_containers().unwrap().len(), CONTAINER_CATALOG.len());
}

#[test]
fn bootstrap_preserves_other_record_fields() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);
    registry.bootstrap(true).unwrap();
    let event = registry.container_by_slug("event").unwrap().unwrap();
    let key = container_meta_key(event.id);

    let mut record = options.get_option(&key).unwrap().unwrap();
    record["included_fields_list"] = json!("name,startdate");
    record["rdf_type"] = json!("custom:Type");
    options.set_option(&key, &record).unwrap();

    registry.bootstrap(true).unwrap();

    let record = options.get_option(&key).unwrap().unwrap();
    assert_eq!(record["included_fields_list"], json!("name,startdate"));
    assert_eq!(record["rdf_type"], json!("schema:event"));
}

#[test]
fn bootstrap_refreshes_description_of_existing_container() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);
    let existing = categories
        .create_category(&wpldp_core::model::category::NewCategory {
            taxonomy: CONTAINER_TAXONOMY.to_string(),
            name: "Places we like".to_string(),
            slug: Some("place".to_string()),
            description: "stale".to_string(),
            ..Default::default()
        })
        .unwrap();

    registry.bootstrap(true).unwrap();

    let place = registry.container_by_slug("place").unwrap().unwrap();
    assert_eq!(place.id, existing.id);
    assert_eq!(place.label, "Places we like");
    assert_eq!(place.description, "The place object model");
}

#[test]
fn form_model_falls_back_without_usable_model() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let models: BTreeMap<String, String> = BTreeMap::from([(
        "theme".to_string(),
        "{ \"theme\": { \"fields\": [ { \"name\": \"name\" } ] } }".to_string(),
    )]);
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &models);
    registry.bootstrap(true).unwrap();

    let theme = registry.container_by_slug("theme").unwrap().unwrap();
    let person = registry.container_by_slug("person").unwrap().unwrap();

    assert_eq!(
        registry.form_model(theme.id).unwrap(),
        r#"{"theme":{"fields":[{"name":"name"}]}}"#
    );
    assert_eq!(registry.form_model(person.id).unwrap(), FALLBACK_FORM_MODEL);
    assert_eq!(registry.form_model(9_999).unwrap(), FALLBACK_FORM_MODEL);
}

#[test]
fn context_url_defaults_until_configured() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let settings = LdpSettings::default();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);

    assert_eq!(
        registry.context_url().unwrap(),
        "http://lov.okfn.org/dataset/lov/context"
    );
}

#[test]
fn context_url_prefers_stored_option_over_settings() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let options = SqliteOptionRepository::try_new(&conn).unwrap();
    let settings =
        LdpSettings::from_json_str(r#"{"context_url":"http://example.org/custom"}"#).unwrap();
    let registry = ContainerRegistry::new(&settings, &categories, &options, &BuiltinModelSource);

    assert_eq!(registry.context_url().unwrap(), "http://example.org/custom");

    options
        .set_option("context_url", &json!("http://example.org/context"))
        .unwrap();
    assert_eq!(registry.context_url().unwrap(), "http://example.org/context");

    options.set_option("context_url", &json!("  ")).unwrap();
    assert_eq!(registry.context_url().unwrap(), "http://example.org/custom");
}
