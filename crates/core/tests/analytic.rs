//! Analytic aggregation over folders' distributions.

mod support;

use support::{date, Harness};
use transitdesk_domain::{AnalyticDistribution, Folder, MoveType, StageKind};

fn folder_with(distribution: AnalyticDistribution) -> Folder {
    let mut folder = Folder::draft("TR00001", StageKind::Transit, date(2024, 6, 1));
    folder.id = 1;
    folder.analytic_distribution = distribution;
    folder
}

#[tokio::test]
async fn empty_distribution_issues_no_queries() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.post_line(100.0, &[1]);
    let folder = folder_with(AnalyticDistribution::new());

    assert!(harness.aggregator.lines_for(&folder).await.unwrap().is_empty());
    let balance = harness.aggregator.balance(&folder).await.unwrap();
    assert_eq!((balance.debit, balance.credit, balance.balance), (0.0, 0.0, 0.0));
    let counts = harness.aggregator.invoice_counts(&folder).await.unwrap();
    assert_eq!((counts.customer_invoices, counts.vendor_bills), (0, 0));

    assert_eq!(harness.store.analytic_queries(), 0);
}

#[tokio::test]
async fn composite_keys_match_lines_on_any_account() {
    let harness = Harness::new(date(2024, 6, 10));
    let on_first = harness.store.post_line(200.0, &[10]);
    let on_second = harness.store.post_line(-80.0, &[11]);
    let shared = harness.store.post_line(-20.0, &[99, 11]);
    harness.store.post_line(500.0, &[12]);
    let folder = folder_with(AnalyticDistribution::from_json(r#"{"10,11":100}"#).unwrap());

    let mut ids: Vec<_> =
        harness.aggregator.lines_for(&folder).await.unwrap().iter().map(|l| l.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![on_first, on_second, shared]);

    let (revenue, expense) = harness.aggregator.revenue_and_expense(&folder).await.unwrap();
    assert_eq!(revenue.len(), 1);
    assert_eq!(expense.len(), 2);

    let balance = harness.aggregator.balance(&folder).await.unwrap();
    assert!((balance.debit - 200.0).abs() < f64::EPSILON);
    assert!((balance.credit - 100.0).abs() < f64::EPSILON);
    assert!((balance.balance - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn invoice_counts_are_distinct_per_document_type() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.post_document(MoveType::OutInvoice, &[10]);
    harness.store.post_document(MoveType::OutRefund, &[10, 11]);
    harness.store.post_document(MoveType::InInvoice, &[11]);
    harness.store.post_document(MoveType::Entry, &[10]);
    harness.store.post_document(MoveType::OutInvoice, &[42]);
    let folder = folder_with(AnalyticDistribution::from_json(r#"{"10":50,"11":50}"#).unwrap());

    let counts = harness.aggregator.invoice_counts(&folder).await.unwrap();

    assert_eq!(counts.customer_invoices, 2);
    assert_eq!(counts.vendor_bills, 1);
}

#[tokio::test]
async fn summary_matches_individual_projections() {
    let harness = Harness::new(date(2024, 6, 10));
    harness.store.post_line(300.0, &[5]);
    harness.store.post_line(-120.0, &[5]);
    harness.store.post_line(0.0, &[5]);
    harness.store.post_document(MoveType::InReceipt, &[5]);
    let folder = folder_with(AnalyticDistribution::single(5, 100.0));

    let summary = harness.aggregator.summary(&folder).await.unwrap();

    assert_eq!(summary.revenue.len(), 1);
    assert_eq!(summary.expense.len(), 1);
    assert_eq!(summary.balance, harness.aggregator.balance(&folder).await.unwrap());
    assert_eq!(summary.invoices.vendor_bills, 1);
    assert_eq!(summary.invoices.customer_invoices, 0);
}
