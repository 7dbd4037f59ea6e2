use acl_engine_core::{
    AccessSource, AclEngine, AclError, ObjectIdentity, Permission, ResourceDescriptor,
    ResourceId, SidResolver, StaticResourceCatalog, UNKNOWN_RESOURCE_NAME,
};

fn names(values: &[&str]) -> std::collections::BTreeSet<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

fn seeded() -> (AclEngine, StaticResourceCatalog) {
    let engine = AclEngine::in_memory().unwrap();
    let editors = SidResolver::group("EDITORS");
    let apollo = ObjectIdentity::new("Project", 1);
    engine
        .grant(None, &apollo, &editors, &[Permission::READ, Permission::WRITE])
        .unwrap();

    // Document 10: inherits READ and WRITE, holds READ directly.
    let spec = ObjectIdentity::new("Document", 10);
    engine.set_parent(None, &spec, &apollo, true).unwrap();
    engine.grant(None, &spec, &editors, &[Permission::READ]).unwrap();

    // Document 11: direct grant only, inheritance switched off.
    let notes = ObjectIdentity::new("Document", 11);
    engine.set_parent(None, &notes, &apollo, false).unwrap();
    engine
        .grant(None, &notes, &editors, &[Permission::SHARE])
        .unwrap();

    // Document 12: nothing for the editors.
    engine
        .grant_to_user(None, &ObjectIdentity::new("Document", 12), "zoe", &[Permission::READ])
        .unwrap();

    let catalog = StaticResourceCatalog::new()
        .with_resource("Project", ResourceDescriptor::new(1, "Apollo"))
        .with_resource("Document", ResourceDescriptor::new(10, "Spec"))
        .with_resource("Document", ResourceDescriptor::new(11, "Notes"))
        .with_resource("Document", ResourceDescriptor::new(12, "Diary"))
        .with_resource("Document", ResourceDescriptor::new(13, "Draft"))
        .with_type("Comment");
    (engine, catalog)
}

#[test]
fn effective_permissions_split_direct_and_inherited() {
    let (engine, _) = seeded();
    let sids = SidResolver::sids_for_caller("ed", ["GROUP_EDITORS"]);

    let spec = engine
        .effective_permissions(&ObjectIdentity::new("Document", 10), &sids)
        .unwrap();
    assert_eq!(spec.granted, names(&["READ"]));
    assert_eq!(spec.inherited, names(&["READ", "WRITE"]));
    assert!(spec.has_access);
    assert_eq!(spec.parent, Some(ObjectIdentity::new("Project", 1)));

    let notes = engine
        .effective_permissions(&ObjectIdentity::new("Document", 11), &sids)
        .unwrap();
    assert_eq!(notes.granted, names(&["SHARE"]));
    assert!(notes.inherited.is_empty());
    assert_eq!(notes.parent, None);

    let missing = engine
        .effective_permissions(&ObjectIdentity::new("Document", 99), &sids)
        .unwrap();
    assert!(!missing.has_access);
    assert!(missing.granted.is_empty() && missing.inherited.is_empty());
}

#[test]
fn accessible_resources_tags_the_source() {
    let (engine, catalog) = seeded();
    let sids = SidResolver::sids_for_caller("ed", ["GROUP_EDITORS"]);

    let result = engine
        .accessible_resources_in(&catalog, "document", &sids)
        .unwrap();
    assert_eq!(result.resource_type, "Document");
    assert_eq!(result.total_count, 2);
    assert_eq!(result.resources.len(), 2);

    let spec = &result.resources[0];
    assert_eq!(spec.resource_id, ResourceId::Number(10));
    assert_eq!(spec.name, "Spec");
    assert_eq!(spec.source, AccessSource::Inherited);
    assert_eq!(spec.permissions, names(&["READ", "WRITE"]));

    let notes = &result.resources[1];
    assert_eq!(notes.name, "Notes");
    assert_eq!(notes.source, AccessSource::Direct);
    assert_eq!(notes.permissions, names(&["SHARE"]));

    let nobody = engine
        .accessible_resources_in(&catalog, "Comment", &sids)
        .unwrap();
    assert_eq!(nobody.total_count, 0);
}

#[test]
fn unknown_resource_types_are_rejected() {
    let (engine, catalog) = seeded();
    let sids = SidResolver::sids_for_caller("ed", ["GROUP_EDITORS"]);
    assert!(matches!(
        engine.accessible_resources_in(&catalog, "Invoice", &sids),
        Err(AclError::InvalidArgument { .. })
    ));
}

#[test]
fn inheritance_info_lists_all_granting_names() {
    let (engine, catalog) = seeded();

    let info = engine
        .inheritance_info(&catalog, &ObjectIdentity::new("Document", 10))
        .unwrap();
    assert_eq!(info.name, "Spec");
    assert_eq!(info.direct, vec!["READ"]);
    assert_eq!(info.inherited, vec!["READ", "WRITE"]);
    assert!(info.entries_inheriting);
    assert!(info.has_parent);
    let parent = info.parent.unwrap();
    assert_eq!(parent.identity, ObjectIdentity::new("Project", 1));
    assert_eq!(parent.name, "Apollo");

    // The parent is reported even when the ACL does not inherit from it.
    let notes = engine
        .inheritance_info(&catalog, &ObjectIdentity::new("Document", 11))
        .unwrap();
    assert!(!notes.entries_inheriting);
    assert!(notes.has_parent);
    assert_eq!(notes.inherited, vec!["READ", "WRITE"]);
}

#[test]
fn inheritance_info_for_unknown_acl() {
    let (engine, catalog) = seeded();

    let draft = engine
        .inheritance_info(&catalog, &ObjectIdentity::new("Document", 13))
        .unwrap();
    assert_eq!(draft.name, "Draft");
    assert!(draft.direct.is_empty());
    assert!(!draft.entries_inheriting);
    assert!(!draft.has_parent);
    assert!(draft.parent.is_none());

    let stranger = engine
        .inheritance_info(&catalog, &ObjectIdentity::new("Document", 404))
        .unwrap();
    assert_eq!(stranger.name, UNKNOWN_RESOURCE_NAME);
}
