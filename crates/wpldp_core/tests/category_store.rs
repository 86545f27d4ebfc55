use uuid::Uuid;
use wpldp_core::db::open_db_in_memory;
use wpldp_core::model::category::{CategoryUpdate, NewCategory};
use wpldp_core::{
    CategoryStore, ResourceStore, SqliteCategoryRepository, SqliteResourceRepository,
    CONTAINER_TAXONOMY, SITE_TAXONOMY,
};

fn container(name: &str, slug: &str) -> NewCategory {
    NewCategory {
        taxonomy: CONTAINER_TAXONOMY.to_string(),
        name: name.to_string(),
        slug: Some(slug.to_string()),
        ..NewCategory::default()
    }
}

#[test]
fn create_allocates_unique_slugs_per_taxonomy() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();

    let first = repo.create_category(&container("Person", "person")).unwrap();
    let second = repo.create_category(&container("Person", "person")).unwrap();
    let site = repo
        .create_category(&NewCategory {
            taxonomy: SITE_TAXONOMY.to_string(),
            name: "person".to_string(),
            ..NewCategory::default()
        })
        .unwrap();

    assert_eq!(first.slug, "person");
    assert_eq!(second.slug, "person-2");
    assert_eq!(site.slug, "person");
    assert_eq!(
        repo.get_category_by_slug(CONTAINER_TAXONOMY, "person")
            .unwrap()
            .map(|category| category.id),
        Some(first.id)
    );
}

#[test]
fn update_only_touches_given_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();
    let created = repo.create_category(&container("Theme", "theme")).unwrap();

    let updated = repo
        .update_category(
            created.id,
            &CategoryUpdate {
                description: Some("The theme object model".to_string()),
                ..CategoryUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Theme");
    assert_eq!(updated.slug, "theme");
    assert_eq!(updated.description, "The theme object model");
}

#[test]
fn delete_reassigns_orphaned_resources_to_successor() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let resources = SqliteResourceRepository::try_new(&conn).unwrap();

    let actor = categories.create_category(&container("Actor", "actor")).unwrap();
    let person = categories.create_category(&container("Person", "person")).unwrap();
    let child = categories
        .create_category(&NewCategory {
            parent_id: Some(actor.id),
            ..container("Sub actor", "sub-actor")
        })
        .unwrap();
    categories.set_category_meta(actor.id, "note", "x").unwrap();

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    resources.assign_container(first, actor.id).unwrap();
    resources.assign_container(second, actor.id).unwrap();

    categories.delete_category(actor.id, Some(person.id)).unwrap();

    assert!(categories.get_category(actor.id).unwrap().is_none());
    assert!(categories.get_category_meta(actor.id, "note").unwrap().is_none());
    assert_eq!(
        categories.get_category(child.id).unwrap().unwrap().parent_id,
        None
    );
    let mut moved = resources.resources_in_category(person.id).unwrap();
    moved.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(moved, expected);
}

#[test]
fn delete_without_successor_leaves_resources_untagged() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let resources = SqliteResourceRepository::try_new(&conn).unwrap();

    let idea = categories.create_category(&container("Idea", "idea")).unwrap();
    let resource = Uuid::new_v4();
    resources.assign_container(resource, idea.id).unwrap();

    categories.delete_category(idea.id, None).unwrap();

    assert!(resources
        .resource_categories(resource, CONTAINER_TAXONOMY)
        .unwrap()
        .is_empty());
}

#[test]
fn find_by_meta_matches_substrings() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCategoryRepository::try_new(&conn).unwrap();
    let site = repo
        .create_category(&NewCategory {
            taxonomy: SITE_TAXONOMY.to_string(),
            name: "host /api/ldp/".to_string(),
            ..NewCategory::default()
        })
        .unwrap();
    repo.set_category_meta(site.id, "site_url", "http://host/api/ldp/")
        .unwrap();

    let exact = repo
        .find_categories_by_meta(SITE_TAXONOMY, "site_url", "http://host/api/ldp/")
        .unwrap();
    let partial = repo
        .find_categories_by_meta(SITE_TAXONOMY, "site_url", "host/api")
        .unwrap();
    let other_scheme = repo
        .find_categories_by_meta(SITE_TAXONOMY, "site_url", "https://host/api/ldp/")
        .unwrap();

    assert_eq!(exact.len(), 1);
    assert_eq!(partial.len(), 1);
    assert!(other_scheme.is_empty());
}

#[test]
fn assign_container_keeps_exactly_one_container() {
    let conn = open_db_in_memory().unwrap();
    let categories = SqliteCategoryRepository::try_new(&conn).unwrap();
    let resources = SqliteResourceRepository::try_new(&conn).unwrap();
    let group = categories.create_category(&container("Group", "group")).unwrap();
    let place = categories.create_category(&container("Place", "place")).unwrap();
    let resource = Uuid::new_v4();

    resources.assign_container(resource, group.id).unwrap();
    resources.assign_container(resource, place.id).unwrap();

    let assigned = resources
        .resource_categories(resource, CONTAINER_TAXONOMY)
        .unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].slug, "place");
}
