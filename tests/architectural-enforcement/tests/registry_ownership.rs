//! Integration Test: Registry Ownership
//!
//! **Policy**: The layer registry and the controller are single-owner state
//! mutated on the owner's turn. No locks in the core crate.

use architectural_enforcement::find_violations;

#[test]
fn test_no_locks_in_core() {
    let violations = find_violations(&["mapsync/core/src"], &["Mutex", "RwLock"]);

    assert!(
        violations.is_empty(),
        "Locks found in core:\n{}",
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}
