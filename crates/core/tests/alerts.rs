//! Alert notifier and batch reporter scenarios.

mod support;

use chrono::Duration;
use support::{date, Harness};
use transitdesk_core::{Clock, ReportSettings};
use transitdesk_domain::{AlertState, Folder, MailState, StageKind};

fn folder_with_eta(harness: &Harness, name: &str, eta_offset: Option<i64>) -> i64 {
    let today = harness.clock.today();
    let mut folder = Folder::draft(name, StageKind::Transit, today);
    folder.eta = eta_offset.map(|days| today + Duration::days(days));
    harness.store.insert_folder(folder)
}

#[tokio::test]
async fn equal_states_produce_no_side_effects() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.seed_alert_templates();
    let id = folder_with_eta(&harness, "TR00001", Some(1));
    let folder = harness.store.folder(id);

    for state in [AlertState::Open, AlertState::Danger, AlertState::Overdue] {
        let outcome = harness.notifier.notify(&folder, state, state, None).await;
        assert!(outcome.transition.is_none());
    }

    assert!(harness.store.notes_for(id).is_empty());
    assert!(harness.store.activities_for(id).is_empty());
}

#[tokio::test]
async fn unsaved_folders_are_not_notified() {
    let harness = Harness::new(date(2024, 6, 10));
    let folder = Folder::draft("TR00009", StageKind::Transit, date(2024, 6, 10));

    let outcome =
        harness.notifier.notify(&folder, AlertState::Open, AlertState::Danger, None).await;

    assert!(!outcome.note_posted);
    assert!(!outcome.activity_scheduled);
}

#[tokio::test]
async fn leaving_open_schedules_follow_up_for_owner() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.seed_alert_templates();
    let owner = harness.store.add_user("Awa Diop", Some("awa@example.com"), &[]);
    let mut folder = Folder::draft("TR00002", StageKind::Transit, date(2024, 6, 1));
    folder.eta = Some(date(2024, 6, 9));
    folder.user_id = Some(owner);
    let id = harness.store.insert_folder(folder);
    let folder = harness.store.folder(id);

    let outcome =
        harness.notifier.notify(&folder, AlertState::Open, AlertState::Overdue, Some(99)).await;

    assert!(outcome.note_posted);
    assert!(outcome.activity_scheduled);
    let activities = harness.store.activities_for(id);
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].user_id, Some(owner));
    assert_eq!(activities[0].due_date, date(2024, 6, 10));
    assert!(activities[0].summary.contains("TR00002"));
    assert!(activities[0].note.as_deref().unwrap_or_default().contains("09/06/2024"));
}

#[tokio::test]
async fn follow_up_falls_back_to_actor_and_skips_missing_template() {
    let harness = Harness::new(date(2024, 6, 10));
    let id = folder_with_eta(&harness, "TR00003", Some(2));
    let folder = harness.store.folder(id);

    let outcome =
        harness.notifier.notify(&folder, AlertState::Open, AlertState::Danger, Some(7)).await;
    assert!(outcome.note_posted);
    assert!(!outcome.activity_scheduled, "no alert template configured");

    harness.store.seed_alert_templates();
    let outcome =
        harness.notifier.notify(&folder, AlertState::Open, AlertState::Danger, Some(7)).await;
    assert!(outcome.activity_scheduled);
    assert_eq!(harness.store.activities_for(id)[0].user_id, Some(7));
}

#[tokio::test]
async fn empty_batch_updates_nothing_and_sends_nothing() {
    let harness = Harness::new(date(2024, 6, 10));
    folder_with_eta(&harness, "TR00001", None);

    let report = harness.reporter.run_batch().await.unwrap();

    assert_eq!(report.updated_count, 0);
    assert!(!report.report_sent);
    assert!(harness.store.mails().is_empty());
}

#[tokio::test]
async fn danger_then_overdue_scenario() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.seed_alert_templates();
    harness.store.add_user("Manager", Some("manager@example.com"), &["transit_manager"]);
    let id = folder_with_eta(&harness, "TR00001", Some(2));

    let first = harness.reporter.run_batch().await.unwrap();
    assert_eq!(first.updated_count, 1);
    assert_eq!(first.newly_danger, vec!["TR00001".to_string()]);
    assert_eq!(harness.store.folder(id).alert_state, AlertState::Danger);
    assert_eq!(harness.store.activities_for(id).len(), 1);

    let second = harness.reporter.run_batch().await.unwrap();
    assert_eq!(second.updated_count, 0);
    assert_eq!(harness.store.notes_for(id).len(), 1);
    assert_eq!(harness.store.activities_for(id).len(), 1);

    // ETA slips into the past: danger -> overdue posts a note but no new activity.
    harness.clock.advance_days(3);
    let third = harness.reporter.run_batch().await.unwrap();
    assert_eq!(third.updated_count, 1);
    assert_eq!(third.newly_overdue, vec!["TR00001".to_string()]);
    assert_eq!(harness.store.folder(id).alert_state, AlertState::Overdue);

    let notes = harness.store.notes_for(id);
    assert_eq!(notes.len(), 2);
    assert!(notes[1].starts_with("🚨 Critical"));
    assert_eq!(harness.store.activities_for(id).len(), 1);
}

#[tokio::test]
async fn digest_goes_to_owners_and_managers_once() {
    let harness = Harness::new(date(2024, 6, 10));
    let owner = harness.store.add_user("Awa Diop", Some("awa@example.com"), &[]);
    let no_mail = harness.store.add_user("Moussa", None, &[]);
    harness.store.add_user("Chief", Some("chief@example.com"), &["transit_manager"]);
    harness.store.add_user("Deputy", Some("awa@example.com"), &["transit_manager"]);

    let mut late = Folder::draft("TR00002", StageKind::Transit, date(2024, 6, 1));
    late.eta = Some(date(2024, 6, 7));
    late.user_id = Some(owner);
    late.customer = Some("SOCOCIM".into());
    harness.store.insert_folder(late);

    let mut soon = Folder::draft("TR00001", StageKind::Transit, date(2024, 6, 1));
    soon.eta = Some(date(2024, 6, 12));
    soon.user_id = Some(no_mail);
    harness.store.insert_folder(soon);

    let report = harness.reporter.run_batch().await.unwrap();

    assert!(report.report_sent);
    assert_eq!(report.overdue, vec!["TR00002".to_string()]);
    assert_eq!(report.danger, vec!["TR00001".to_string()]);

    let mails = harness.store.mails();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].recipients, vec!["awa@example.com", "chief@example.com"]);
    assert_eq!(mails[0].subject, "ETA alert report 10/06/2024 - 1 overdue, 1 in danger");
    assert!(mails[0].body_html.contains("<td>SOCOCIM</td><td>07/06/2024</td><td>3</td>"));
    assert!(mails[0].body_html.contains("<td>Moussa</td><td>N/A</td>"));
}

#[tokio::test]
async fn digest_skipped_without_recipients() {
    let harness = Harness::new(date(2024, 6, 10));
    folder_with_eta(&harness, "TR00001", Some(-1));

    let report = harness.reporter.run_batch().await.unwrap();

    assert_eq!(report.updated_count, 1);
    assert!(!report.report_sent);
    assert!(harness.store.mails().is_empty());
}

#[tokio::test]
async fn mail_failure_does_not_fail_the_batch() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.add_user("Chief", Some("chief@example.com"), &["transit_manager"]);
    folder_with_eta(&harness, "TR00001", Some(-2));
    harness.store.fail_mail(true);

    let report = harness.reporter.run_batch().await.unwrap();

    assert_eq!(report.updated_count, 1);
    assert!(!report.report_sent);
}

#[tokio::test]
async fn failing_folder_is_skipped() {
    let harness = Harness::new(date(2024, 6, 10));
    let broken = folder_with_eta(&harness, "TR00001", Some(-2));
    let healthy = folder_with_eta(&harness, "TR00002", Some(-2));
    harness.store.fail_alert_writes_for(broken);

    let report = harness.reporter.run_batch().await.unwrap();

    assert_eq!(report.updated_count, 1);
    assert_eq!(harness.store.folder(broken).alert_state, AlertState::Open);
    assert_eq!(harness.store.folder(healthy).alert_state, AlertState::Overdue);
    assert_eq!(report.overdue, vec!["TR00002".to_string()]);
}

#[tokio::test]
async fn archived_folders_are_ignored() {
    let harness = Harness::new(date(2024, 6, 10));
    folder_with_eta(&harness, "TR00001", Some(-2));
    let mut archived = Folder::draft("TR00002", StageKind::Transit, date(2024, 6, 1));
    archived.eta = Some(date(2024, 6, 8));
    archived.active = false;
    let archived = harness.store.insert_folder(archived);

    let report = harness.reporter.run_batch().await.unwrap();

    assert_eq!(report.updated_count, 1);
    assert_eq!(report.overdue, vec!["TR00001".to_string()]);
    assert_eq!(harness.store.folder(archived).alert_state, AlertState::Open);
}

#[tokio::test]
async fn immediate_rerun_sends_no_report() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.add_user("Chief", Some("chief@example.com"), &["transit_manager"]);
    folder_with_eta(&harness, "TR00001", Some(-2));

    let first = harness.reporter.run_batch().await.unwrap();
    let second = harness.reporter.run_batch().await.unwrap();

    assert_eq!(first.updated_count, 1);
    assert!(first.report_sent);
    assert_eq!(second.updated_count, 0);
    assert!(!second.report_sent);
    assert_eq!(second.report_state, None);
    assert_eq!(second.overdue, vec!["TR00001".to_string()]);
    assert_eq!(harness.store.mails().len(), 1);
}

#[tokio::test]
async fn daily_digest_repeats_when_enabled() {
    let harness = Harness::with_settings(
        date(2024, 6, 10),
        ReportSettings { manager_role: "transit_manager".into(), report_only_on_change: false },
    );
    harness.store.add_user("Chief", Some("chief@example.com"), &["transit_manager"]);
    folder_with_eta(&harness, "TR00001", Some(-2));

    harness.reporter.run_batch().await.unwrap();
    let second = harness.reporter.run_batch().await.unwrap();

    assert_eq!(second.updated_count, 0);
    assert!(second.report_sent);
    assert_eq!(harness.store.mails().len(), 2);
}

#[tokio::test]
async fn queued_digest_is_reported_as_not_delivered() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.add_user("Chief", Some("chief@example.com"), &["transit_manager"]);
    folder_with_eta(&harness, "TR00001", Some(-2));
    harness.store.queue_mail(true);

    let report = harness.reporter.run_batch().await.unwrap();

    assert!(report.report_sent);
    assert_eq!(report.report_state, Some(MailState::Queued));
}

#[tokio::test]
async fn relayed_digest_is_reported_as_sent() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.add_user("Chief", Some("chief@example.com"), &["transit_manager"]);
    folder_with_eta(&harness, "TR00001", Some(2));

    let report = harness.reporter.run_batch().await.unwrap();

    assert_eq!(report.report_state, Some(MailState::Sent));
}
