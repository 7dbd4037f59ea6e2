use acl_engine_core::{
    AclEngine, AclError, AclStore, ObjectIdentity, Permission, PermissionRegistry, SidResolver,
};

fn project(id: i64) -> ObjectIdentity {
    ObjectIdentity::new("Project", id)
}

fn user(name: &str) -> acl_engine_core::SidSet {
    SidResolver::sids_for_caller(name, Vec::<String>::new())
}

#[test]
fn ownership_grant_and_evaluation_scenario() -> acl_engine_core::Result<()> {
    let mut registry = PermissionRegistry::new();
    registry.register("READ", Permission::READ)?;
    registry.register("WRITE", Permission::WRITE)?;
    registry.register("DELETE", Permission::DELETE)?;
    registry.register("ADMINISTRATION", Permission::ADMINISTRATION)?;
    registry.register("SHARE", Permission::SHARE)?;
    registry.set_owner_defaults(vec![
        Permission::ADMINISTRATION,
        Permission::READ,
        Permission::WRITE,
        Permission::DELETE,
        Permission::SHARE,
    ])?;
    let engine = AclEngine::builder().registry(registry).build()?;
    let identity = project(1);

    engine.apply_ownership(Some("admin"), &identity, "alice")?;
    let acl = engine.read_acl(&identity)?;
    assert_eq!(acl.owner, Some(SidResolver::principal("alice")));
    assert_eq!(acl.len(), 5);
    let mut masks: Vec<u32> = acl.entries().iter().map(|e| e.permission.mask).collect();
    masks.sort_unstable();
    assert_eq!(masks, vec![1, 2, 8, 16, 32]);

    engine.grant(
        Some("alice"),
        &identity,
        &SidResolver::group("ENGINEERING"),
        &[Permission::READ],
    )?;
    assert_eq!(engine.read_acl(&identity)?.len(), 6);

    assert!(!engine.has_permission(&user("bob"), &identity, &[Permission::READ]));
    let engineering: acl_engine_core::SidSet =
        [SidResolver::group("ENGINEERING")].into_iter().collect();
    assert!(engine.has_permission(&engineering, &identity, &[Permission::READ]));
    Ok(())
}

#[test]
fn owner_defaults_are_all_granted() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(2);
    assert!(engine.apply_ownership(None, &identity, "alice").unwrap());
    let alice = user("alice");
    for permission in [
        Permission::READ,
        Permission::WRITE,
        Permission::DELETE,
        Permission::ADMINISTRATION,
        Permission::SHARE,
    ] {
        assert!(engine.has_permission(&alice, &identity, &[permission]));
    }
    assert!(!engine.has_permission(&alice, &identity, &[Permission::APPROVE]));
    assert!(!engine.apply_ownership(None, &identity, "alice").unwrap());
}

#[test]
fn transferring_ownership_keeps_previous_owner_entries() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(3);
    engine.apply_ownership(None, &identity, "alice").unwrap();
    engine.apply_ownership(None, &identity, "dave").unwrap();
    let acl = engine.read_acl(&identity).unwrap();
    assert_eq!(acl.owner, Some(SidResolver::principal("dave")));
    assert_eq!(acl.len(), 10);
    assert!(engine.has_permission(&user("alice"), &identity, &[Permission::READ]));
}

#[test]
fn grant_is_idempotent() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(4);
    let bob = SidResolver::principal("bob");
    assert!(engine
        .grant(None, &identity, &bob, &[Permission::READ])
        .unwrap());
    let before = engine.read_acl(&identity).unwrap().len();
    assert!(!engine
        .grant(None, &identity, &bob, &[Permission::READ])
        .unwrap());
    assert_eq!(engine.read_acl(&identity).unwrap().len(), before);
}

#[test]
fn empty_permission_lists_are_no_ops() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(5);
    let bob = SidResolver::principal("bob");
    assert!(!engine.grant(None, &identity, &bob, &[]).unwrap());
    assert!(!engine.revoke(None, &identity, &bob, &[]).unwrap());
    // Neither call created the ACL.
    assert!(engine.read_acl(&identity).unwrap_err().is_not_found());
}

#[test]
fn revoke_is_symmetric_and_repeatable() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(6);
    let bob = SidResolver::principal("bob");
    engine
        .grant(None, &identity, &bob, &[Permission::READ, Permission::WRITE])
        .unwrap();
    assert!(engine
        .revoke(None, &identity, &bob, &[Permission::READ])
        .unwrap());
    assert!(!engine.has_permission(&user("bob"), &identity, &[Permission::READ]));
    assert!(engine.has_permission(&user("bob"), &identity, &[Permission::WRITE]));
    assert!(!engine
        .revoke(None, &identity, &bob, &[Permission::READ])
        .unwrap());

    let positions: Vec<usize> = engine
        .read_acl(&identity)
        .unwrap()
        .entries()
        .iter()
        .map(|entry| entry.position)
        .collect();
    assert_eq!(positions, vec![0]);
}

#[test]
fn evaluation_is_conjunctive() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(7);
    engine
        .grant_to_user(None, &identity, "bob", &[Permission::READ])
        .unwrap();
    let bob = user("bob");
    assert!(engine.has_permission(&bob, &identity, &[Permission::READ]));
    assert!(!engine.has_permission(&bob, &identity, &[Permission::READ, Permission::WRITE]));
}

#[test]
fn unknown_object_evaluates_to_false() {
    let engine = AclEngine::in_memory().unwrap();
    assert!(!engine.has_permission(&user("alice"), &project(404), &[Permission::READ]));
    assert!(!engine
        .check(&user("alice"), &project(404), &["READ"])
        .unwrap());
}

#[test]
fn role_group_and_authority_grants_match_caller_authorities() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(8);
    engine
        .grant_to_role(None, &identity, "MANAGER", &[Permission::APPROVE])
        .unwrap();
    engine
        .grant_to_group(None, &identity, "MARKETING", &[Permission::READ])
        .unwrap();
    engine
        .grant_to_authority(None, &identity, "SCOPE_export", &[Permission::SHARE])
        .unwrap();

    let caller = SidResolver::sids_for_caller(
        "erin",
        ["ROLE_MANAGER", "GROUP_MARKETING", "SCOPE_export"],
    );
    assert!(engine.has_permission(
        &caller,
        &identity,
        &[Permission::APPROVE, Permission::READ, Permission::SHARE]
    ));
    // A principal named like the role does not match the authority.
    assert!(!engine.has_permission(&user("ROLE_MANAGER"), &identity, &[Permission::APPROVE]));
}

#[test]
fn name_based_operations_resolve_through_registry() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(9);
    let bob = SidResolver::principal("bob");
    engine
        .grant_by_names(None, &identity, &bob, &["read", "Share"])
        .unwrap();
    assert!(engine.check(&user("bob"), &identity, &["READ", "SHARE"]).unwrap());

    let err = engine
        .grant_by_names(None, &identity, &bob, &["PUBLISH"])
        .unwrap_err();
    assert!(matches!(err, AclError::UnknownPermission { .. }));
    assert!(matches!(
        engine.check(&user("bob"), &identity, &["PUBLISH"]),
        Err(AclError::UnknownPermission { .. })
    ));

    engine
        .revoke_by_names(None, &identity, &bob, &["share"])
        .unwrap();
    assert!(!engine.check(&user("bob"), &identity, &["SHARE"]).unwrap());
}

#[test]
fn bulk_operations_apply_per_identifier() {
    let engine = AclEngine::in_memory().unwrap();
    let reviewers = SidResolver::group("REVIEWERS");
    engine
        .bulk_grant(None, "Document", [1, 2, 3], &reviewers, &[Permission::READ])
        .unwrap();
    engine
        .bulk_grant_to_users(None, "Document", [2, 3], "frank", &[Permission::WRITE])
        .unwrap();
    engine
        .bulk_revoke(None, "Document", [3], &reviewers, &[Permission::READ])
        .unwrap();

    let sids = SidResolver::sids_for_caller("frank", ["GROUP_REVIEWERS"]);
    let doc = |id: i64| ObjectIdentity::new("Document", id);
    assert!(engine.has_permission(&sids, &doc(1), &[Permission::READ]));
    assert!(!engine.has_permission(&sids, &doc(1), &[Permission::WRITE]));
    assert!(engine.has_permission(&sids, &doc(2), &[Permission::READ, Permission::WRITE]));
    assert!(!engine.has_permission(&sids, &doc(3), &[Permission::READ]));
    assert!(engine.has_permission(&sids, &doc(3), &[Permission::WRITE]));
    assert_eq!(engine.store_counts().object_identities, 3);
}

#[test]
fn revoke_all_for_sid_leaves_other_sids() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(10);
    engine.apply_ownership(None, &identity, "alice").unwrap();
    engine
        .grant_to_user(None, &identity, "bob", &[Permission::READ, Permission::WRITE])
        .unwrap();

    let bob = SidResolver::principal("bob");
    assert!(engine.revoke_all_for_sid(None, &identity, &bob).unwrap());
    assert!(!engine.revoke_all_for_sid(None, &identity, &bob).unwrap());
    let acl = engine.read_acl(&identity).unwrap();
    assert_eq!(acl.len(), 5);
    assert!(acl.entries().iter().all(|entry| entry.sid != bob));
}

#[test]
fn ensure_acl_is_idempotent_and_direct_create_is_not() {
    let engine = AclEngine::in_memory().unwrap();
    let identity = project(11);
    let first = engine.ensure_acl(None, &identity).unwrap();
    let second = engine.ensure_acl(None, &identity).unwrap();
    assert_eq!(first, second);
    assert!(first.entries_inheriting);
    assert!(first.owner.is_none());
    assert!(matches!(
        engine.store().create(&identity),
        Err(AclError::AlreadyExists { .. })
    ));
}

#[test]
fn invalid_inputs_are_rejected() {
    let engine = AclEngine::in_memory().unwrap();
    assert!(matches!(
        engine.apply_ownership(None, &project(12), " "),
        Err(AclError::InvalidArgument { .. })
    ));
    assert!(matches!(
        engine.ensure_acl(None, &ObjectIdentity::new("", 1)),
        Err(AclError::InvalidArgument { .. })
    ));
    assert!(matches!(
        engine.grant(
            None,
            &project(12),
            &SidResolver::principal("bob"),
            &[Permission::new(3, 'X')]
        ),
        Err(AclError::InvalidMask { mask: 3 })
    ));
}

#[test]
fn grants_store_the_registered_definition() {
    let engine = AclEngine::in_memory().unwrap();
    let bob = SidResolver::principal("bob");
    assert!(engine
        .grant(None, &project(13), &bob, &[Permission::new(32, 'X')])
        .unwrap());

    let acl = engine.store().read(&project(13)).unwrap();
    assert_eq!(acl.entries()[0].permission, Permission::SHARE);
    // Same mask, different code: already held.
    assert!(!engine
        .grant(None, &project(13), &bob, &[Permission::SHARE])
        .unwrap());
    assert_eq!(engine.store().read(&project(13)).unwrap().len(), 1);
}
