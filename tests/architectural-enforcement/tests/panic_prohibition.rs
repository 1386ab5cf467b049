//! Integration Test: Panic Prohibition
//!
//! **Policy**: Sync handlers are silent no-ops on bad input, and boundaries
//! (wire decoding, configuration, daemon I/O) return errors. Production code
//! MUST NOT take panicking shortcuts.
//! **Exceptions**: test code

use architectural_enforcement::{find_violations, PRODUCTION_DIRS};

const PANICKING: &[&str] = &[
    ".unwrap()",
    ".expect(",
    "panic!(",
    "todo!(",
    "unimplemented!(",
    "unreachable!(",
];

#[test]
fn test_no_panicking_calls_in_production_code() {
    let violations = find_violations(PRODUCTION_DIRS, PANICKING);

    if !violations.is_empty() {
        eprintln!("\nPanicking calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }

        panic!(
            "\nFound {} panicking call(s) in production code.",
            violations.len()
        );
    }
}
