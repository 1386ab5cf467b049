//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. The controller
//! waits on channels and the enrichment `JoinSet`; the daemon waits on input.
//! **Exceptions**: test code

use architectural_enforcement::{find_violations, PRODUCTION_DIRS};

#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_violations(PRODUCTION_DIRS, &["::sleep(", ".sleep(", "sleep_until("]);

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nWait on I/O, channels or tokio::time::timeout instead.");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}
