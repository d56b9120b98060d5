//! Integration tests for the permission service
//!
//! Covers resolution rules, group management invariants, user lookup and
//! the default hierarchy end to end.

use cretoai_permissions::{
    DecisionReason, PermissionError, PermissionsConfig, PermissionsService, StaticUserProvider,
};
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir) -> PermissionsService {
    PermissionsService::open(dir.path().join("permissions.json")).unwrap()
}

fn open_empty(dir: &TempDir) -> PermissionsService {
    let config = PermissionsConfig::new(dir.path().join("permissions.json")).with_bootstrap(false);
    PermissionsService::new(config).unwrap()
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_default_deny() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    for role in ["guest", "user", "premium"] {
        assert!(!service.check_role(role, "never.granted.anywhere"));
    }
}

#[test]
fn test_universal_wildcard() {
    let dir = TempDir::new().unwrap();
    let service = open_empty(&dir);

    service.create_group("root", 0, Vec::<String>::new()).unwrap();
    service.grant("root", "*", true, true).unwrap();

    assert!(service.check_role("root", "anything.at.all"));
    assert!(service.check_role("root", "x"));
}

#[test]
fn test_specificity_beats_wildcard_breadth() {
    let dir = TempDir::new().unwrap();
    let service = open_empty(&dir);

    service.create_group("g", 0, Vec::<String>::new()).unwrap();
    service.grant("g", "content.*", true, true).unwrap();
    service.grant("g", "content.delete", false, false).unwrap();

    assert!(!service.check_role("g", "content.delete"));
    assert!(service.check_role("g", "content.read"));
}

#[test]
fn test_weight_arbitration() {
    let dir = TempDir::new().unwrap();
    let service = open_empty(&dir);

    service.create_group("a", 20, Vec::<String>::new()).unwrap();
    service.create_group("b", 15, Vec::<String>::new()).unwrap();
    service.grant("a", "content.edit", true, false).unwrap();
    service.grant("b", "content.edit", false, false).unwrap();
    service.create_group("h", 0, ["a", "b"]).unwrap();

    assert!(service.check_role("h", "content.edit"));

    // Flipping the weights flips the outcome
    service.set_group_weight("b", 25).unwrap();
    assert!(!service.check_role("h", "content.edit"));
}

#[test]
fn test_own_weight_does_not_override_specificity() {
    let dir = TempDir::new().unwrap();
    let service = open_empty(&dir);

    service.create_group("base", 1, Vec::<String>::new()).unwrap();
    service.grant("base", "reports.export", false, false).unwrap();
    service.create_group("top", 1000, ["base"]).unwrap();
    service.grant("top", "reports.*", true, true).unwrap();

    assert!(!service.check_role("top", "reports.export"));
    assert!(service.check_role("top", "reports.view"));
}

#[test]
fn test_tie_break_by_group_name() {
    let dir = TempDir::new().unwrap();
    let service = open_empty(&dir);

    service.create_group("writers", 10, Vec::<String>::new()).unwrap();
    service.create_group("auditors", 10, Vec::<String>::new()).unwrap();
    service.grant("writers", "docs.edit", true, false).unwrap();
    service.grant("auditors", "docs.edit", false, false).unwrap();
    service.create_group("staff", 0, ["writers", "auditors"]).unwrap();

    let trace = service.trace_role("staff", "docs.edit").unwrap();
    assert!(!trace.allowed());
    assert_eq!(trace.decision.winner().unwrap().group, "auditors");

    // Parent order does not matter
    service.remove_parent("staff", "writers").unwrap();
    service.add_parent("staff", "writers").unwrap();
    assert!(!service.check_role("staff", "docs.edit"));
}

#[test]
fn test_invalid_query_denies() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(!service.check_role("admin", "*"));
    assert!(!service.check_role("admin", "Admin.Delete"));
    assert!(matches!(
        service.trace_role("admin", "admin.*"),
        Err(PermissionError::InvalidNodeFormat(_))
    ));
}

#[test]
fn test_unknown_role_denies() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(!service.check_role("ghost", "auth.login"));
    let decision = service.decide("ghost", "auth.login").unwrap();
    assert_eq!(decision.reason, DecisionReason::UnknownRole);
}

// ============================================================================
// Group management
// ============================================================================

#[test]
fn test_cycle_prevention() {
    let dir = TempDir::new().unwrap();
    let service = open_empty(&dir);

    service.create_group("x", 0, Vec::<String>::new()).unwrap();
    service.create_group("y", 0, Vec::<String>::new()).unwrap();
    service.add_parent("x", "y").unwrap();

    let before = service.groups();
    let result = service.add_parent("y", "x");

    match result {
        Err(PermissionError::CircularDependency(path)) => assert_eq!(path, "y -> x -> y"),
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
    assert_eq!(service.groups(), before);
}

#[test]
fn test_self_parent_rejected() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(matches!(
        service.add_parent("user", "user"),
        Err(PermissionError::CircularDependency(_))
    ));
    assert!(matches!(
        service.create_group("loop", 0, ["loop"]),
        Err(PermissionError::CircularDependency(_))
    ));
}

#[test]
fn test_long_cycle_prevention() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    // admin -> premium -> user -> guest
    match service.add_parent("guest", "admin") {
        Err(PermissionError::CircularDependency(path)) => {
            assert_eq!(path, "guest -> admin -> premium -> user -> guest")
        }
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
}

#[test]
fn test_deletion_safety() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    match service.delete_group("user") {
        Err(PermissionError::GroupHasDependents { group, dependents }) => {
            assert_eq!(group, "user");
            assert_eq!(dependents, vec!["premium"]);
        }
        other => panic!("Expected GroupHasDependents, got {:?}", other),
    }
    assert!(service.group("user").is_some());

    service.delete_group("admin").unwrap();
    assert!(service.group("admin").is_none());
    service.delete_group("premium").unwrap();
    assert!(service.dependents_of("user").is_empty());
    service.delete_group("user").unwrap();
    assert_eq!(service.group_names(), vec!["guest"]);
}

#[test]
fn test_delete_unknown_group() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(matches!(
        service.delete_group("ghost"),
        Err(PermissionError::UnknownGroup(name)) if name == "ghost"
    ));
}

#[test]
fn test_create_group_errors() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(matches!(
        service.create_group("user", 5, Vec::<String>::new()),
        Err(PermissionError::DuplicateGroup(_))
    ));
    assert!(matches!(
        service.create_group("editor", 5, ["user", "ghost"]),
        Err(PermissionError::UnknownGroup(name)) if name == "ghost"
    ));
    assert!(matches!(
        service.create_group("bad name", 5, Vec::<String>::new()),
        Err(PermissionError::InvalidGroupName(_))
    ));
    assert!(service.group("editor").is_none());
}

#[test]
fn test_create_group_collapses_duplicate_parents() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    service.create_group("editor", 15, ["user", "guest", "user"]).unwrap();
    let editor = service.group("editor").unwrap();
    assert_eq!(editor.inherits, vec!["user", "guest"]);
    assert_eq!(editor.weight, 15);
}

#[test]
fn test_parent_edges() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    service.create_group("support", 5, Vec::<String>::new()).unwrap();
    service.grant("support", "tickets.view", true, false).unwrap();

    assert!(!service.check_role("user", "tickets.view"));
    service.add_parent("user", "support").unwrap();
    assert!(service.check_role("user", "tickets.view"));
    assert!(service.check_role("admin", "tickets.view"));
    assert_eq!(service.group("user").unwrap().inherits, vec!["guest", "support"]);

    service.remove_parent("user", "support").unwrap();
    assert!(!service.check_role("user", "tickets.view"));

    assert!(matches!(
        service.add_parent("user", "ghost"),
        Err(PermissionError::UnknownGroup(_))
    ));
    assert!(matches!(
        service.remove_parent("ghost", "user"),
        Err(PermissionError::UnknownGroup(_))
    ));
}

#[test]
fn test_grant_validation() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(matches!(
        service.grant("user", "Invalid-Node", true, false),
        Err(PermissionError::InvalidNodeFormat(_))
    ));
    assert!(matches!(
        service.grant("user", "content.*.edit", true, true),
        Err(PermissionError::InvalidNodeFormat(_))
    ));

    service.grant("user", "a.b.c", true, false).unwrap();
    assert!(service.check_role("user", "a.b.c"));
}

#[test]
fn test_wildcard_requires_force() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(matches!(
        service.grant("user", "content.*", true, false),
        Err(PermissionError::ForcedWildcardRequired(_))
    ));
    assert!(matches!(
        service.grant("user", "*", true, false),
        Err(PermissionError::ForcedWildcardRequired(_))
    ));
    assert!(!service.check_role("user", "content.read"));

    service.grant("user", "content.*", true, true).unwrap();
    assert!(service.check_role("user", "content.read"));
}

#[test]
fn test_grant_on_unknown_group() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(matches!(
        service.grant("ghost", "a.b", true, false),
        Err(PermissionError::UnknownGroup(_))
    ));
}

#[test]
fn test_revoke() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    service.revoke("guest", "auth.login").unwrap();
    assert!(!service.check_role("guest", "auth.login"));
    assert!(!service.check_role("user", "auth.login"));

    // Absent key is a no-op
    service.revoke("guest", "auth.login").unwrap();
    assert!(matches!(
        service.revoke("ghost", "auth.login"),
        Err(PermissionError::UnknownGroup(_))
    ));
}

#[test]
fn test_explicit_deny_overrides_inherited_grant() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    service.create_group("banned", 50, ["user"]).unwrap();
    service.grant("banned", "auth.login", false, false).unwrap();

    // Same specificity, heavier group wins
    assert!(!service.check_role("banned", "auth.login"));
    assert!(service.check_role("user", "auth.login"));
}

#[test]
fn test_role_permissions_view() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    service.grant("premium", "auth.login", false, false).unwrap();

    let flat = service.role_permissions("premium");
    assert_eq!(flat.get("auth.login"), Some(&false));
    assert_eq!(flat.get("profile.edit"), Some(&true));
    assert_eq!(flat.get("export.*"), Some(&true));
    assert!(flat.get("*").is_none());
}

#[test]
fn test_validate_clean_document() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);
    assert!(service.validate().is_empty());
}

// ============================================================================
// User lookup
// ============================================================================

#[test]
fn test_check_uses_provider_role() {
    let dir = TempDir::new().unwrap();
    let provider = StaticUserProvider::new()
        .with_user("alice", "admin")
        .with_user("bob", "premium");
    let service = open(&dir).with_user_provider(Arc::new(provider));

    assert!(service.check("alice", "system.shutdown"));
    assert!(service.check("bob", "export.pdf"));
    assert!(!service.check("bob", "system.shutdown"));
}

#[test]
fn test_unknown_user_falls_back_to_guest() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir).with_user_provider(Arc::new(StaticUserProvider::new()));

    assert_eq!(service.role_for("mallory"), "guest");
    assert!(service.check("mallory", "auth.login"));
    assert!(!service.check("mallory", "export.csv"));
    assert!(!service.check("mallory", "admin.delete"));
}

#[test]
fn test_no_provider_falls_back_to_default_role() {
    let dir = TempDir::new().unwrap();
    let config = PermissionsConfig::new(dir.path().join("p.json")).with_default_role("user");
    let service = PermissionsService::new(config).unwrap();

    assert_eq!(service.role_for("anyone"), "user");
    assert!(service.check("anyone", "profile.edit"));
}

#[test]
fn test_trace_for_user() {
    let dir = TempDir::new().unwrap();
    let provider = StaticUserProvider::new().with_user("carol", "premium");
    let service = open(&dir).with_user_provider(Arc::new(provider));

    let trace = service.trace("carol", "export.csv").unwrap();
    assert_eq!(trace.role, "premium");
    assert_eq!(trace.chain, vec!["premium", "user", "guest"]);
    assert_eq!(trace.candidates.len(), 1);
    assert_eq!(trace.candidates[0].group, "premium");
    assert_eq!(trace.candidates[0].pattern, "export.*");
    assert!(trace.allowed());
}

// ============================================================================
// Default hierarchy end to end
// ============================================================================

#[test]
fn test_default_hierarchy_scenario() {
    let dir = TempDir::new().unwrap();
    let service = open(&dir);

    assert!(service.check_role("guest", "auth.login"));
    assert!(!service.check_role("guest", "admin.delete"));

    assert!(service.check_role("user", "auth.login"));

    assert!(service.check_role("premium", "export.csv"));
    assert!(service.check_role("premium", "export.pdf"));
    assert!(!service.check_role("premium", "import.csv"));

    assert!(service.check_role("admin", "import.csv"));
    assert!(service.check_role("admin", "admin.delete"));
    assert!(service.check_role("admin", "anything.at.all"));

    assert_eq!(
        service.inheritance_chain("admin"),
        vec!["admin", "premium", "user", "guest"]
    );
}
