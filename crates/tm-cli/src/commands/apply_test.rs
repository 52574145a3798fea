use super::*;
use crate::commands::common::Outcome;
use tm_core::MigrationDescriptor;
use tm_engine::PlannedScript;

fn descriptor(name: &str) -> MigrationDescriptor {
    MigrationDescriptor::from_source(
        ScriptKind::Migration,
        &format!("migrations/{name}.sql"),
        "SELECT 1;".to_string(),
    )
}

fn report(outcome: RunOutcome, planned: &[&str], executed: &[&str]) -> RunReport {
    RunReport {
        kind: ScriptKind::Migration,
        outcome,
        plan: planned
            .iter()
            .map(|name| PlannedScript {
                descriptor: descriptor(name),
                validation: None,
            })
            .collect(),
        executed: executed.iter().map(|name| descriptor(name)).collect(),
    }
}

#[test]
fn test_no_changes_exits_zero() {
    let result = report_result(&report(RunOutcome::NoChanges, &[], &[]));
    assert_eq!(result.outcome, Outcome::NoChanges);
    assert_eq!(result.exit_code, exit_codes::SUCCESS);
}

#[test]
fn test_dry_run_reports_planned_count() {
    let result = report_result(&report(
        RunOutcome::Planned,
        &["V001__a", "V002__b"],
        &[],
    ));
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.data["plannedCount"], 2);
    assert!(!result.data.contains_key("executedCount"));
}

#[test]
fn test_completed_reports_counts() {
    let result = report_result(&report(
        RunOutcome::Completed,
        &["V001__a", "V002__b"],
        &["V001__a", "V002__b"],
    ));
    assert_eq!(result.exit_code, exit_codes::SUCCESS);
    assert_eq!(result.message, "Successfully executed 2 migration(s)");
    assert_eq!(result.data["executedCount"], 2);
    assert_eq!(result.data["totalCount"], 2);
}

#[test]
fn test_validation_failure_exits_five() {
    let outcome = RunOutcome::ValidationFailed {
        name: "V002__b".to_string(),
        errors: "V002__b has empty content".to_string(),
    };
    let result = report_result(&report(outcome, &["V001__a", "V002__b"], &["V001__a"]));
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.exit_code, exit_codes::VALIDATION_ERROR);
    assert_eq!(result.error.as_deref(), Some("V002__b has empty content"));
    assert_eq!(result.data["executedCount"], 1);
}

#[test]
fn test_execution_failure_names_the_migration() {
    let outcome = RunOutcome::ExecutionFailed {
        name: "V002__b".to_string(),
        error: "[D002] Catalog Error: Table with name nope does not exist!".to_string(),
    };
    let result = report_result(&report(outcome, &["V001__a", "V002__b"], &["V001__a"]));
    assert_eq!(result.exit_code, exit_codes::MIGRATION_ERROR);
    assert_eq!(result.message, "Migration failed: V002__b");
    assert_eq!(result.data["failedMigration"], "V002__b");
    assert!(result.error.unwrap().contains("nope"));
}

#[test]
fn test_cancelled_exits_one() {
    let result = report_result(&report(
        RunOutcome::Cancelled,
        &["V001__a", "V002__b", "V003__c"],
        &["V001__a"],
    ));
    assert_eq!(result.outcome, Outcome::Cancelled);
    assert_eq!(result.exit_code, exit_codes::ERROR);
    assert_eq!(result.message, "Cancelled after 1 of 3 migration(s)");
}

#[test]
fn test_seed_messages_use_seed_kind() {
    let mut seed_report = report(
        RunOutcome::ExecutionFailed {
            name: "S001__rows".to_string(),
            error: "boom".to_string(),
        },
        &["S001__rows"],
        &[],
    );
    seed_report.kind = ScriptKind::Seed;
    let result = report_result(&seed_report);
    assert_eq!(result.message, "Seed failed: S001__rows");
}
