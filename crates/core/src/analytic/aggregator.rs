//! Analytic figures of a folder, computed on demand from posted lines.

use std::sync::Arc;

use serde::Serialize;
use transitdesk_domain::{AnalyticLine, Folder, MoveType, Result};

use super::ports::AnalyticRepository;

/// Debit, credit and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Balance {
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
}

impl Balance {
    /// Debit sums positive amounts, credit the magnitude of negative ones.
    pub fn from_lines(lines: &[AnalyticLine]) -> Self {
        let debit: f64 = lines.iter().map(|line| line.amount).filter(|a| *a > 0.0).sum();
        let credit =
            lines.iter().map(|line| line.amount).filter(|a| *a < 0.0).sum::<f64>().abs();
        Self { debit, credit, balance: debit - credit }
    }
}

/// Customer invoices and vendor bills touching a folder's accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceCounts {
    pub customer_invoices: i64,
    pub vendor_bills: i64,
}

/// Every analytic figure of a folder at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticSummary {
    pub revenue: Vec<AnalyticLine>,
    pub expense: Vec<AnalyticLine>,
    pub balance: Balance,
    pub invoices: InvoiceCounts,
}

/// Resolves a folder's analytic distribution into accounts and aggregates
/// the lines posted on them.
pub struct AnalyticDistributionAggregator {
    repository: Arc<dyn AnalyticRepository>,
}

impl AnalyticDistributionAggregator {
    pub fn new(repository: Arc<dyn AnalyticRepository>) -> Self {
        Self { repository }
    }

    /// Lines tagged with any account of the folder's distribution.
    pub async fn lines_for(&self, folder: &Folder) -> Result<Vec<AnalyticLine>> {
        let account_ids = folder.analytic_distribution.account_ids();
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.repository.lines_for_accounts(&account_ids).await
    }

    /// Split lines into revenue (positive) and expense (negative). Zero
    /// amounts land in neither.
    pub async fn revenue_and_expense(
        &self,
        folder: &Folder,
    ) -> Result<(Vec<AnalyticLine>, Vec<AnalyticLine>)> {
        Ok(partition(self.lines_for(folder).await?))
    }

    pub async fn balance(&self, folder: &Folder) -> Result<Balance> {
        Ok(Balance::from_lines(&self.lines_for(folder).await?))
    }

    pub async fn invoice_counts(&self, folder: &Folder) -> Result<InvoiceCounts> {
        let account_ids = folder.analytic_distribution.account_ids();
        if account_ids.is_empty() {
            return Ok(InvoiceCounts::default());
        }
        let customer_invoices =
            self.repository.count_documents(&account_ids, &MoveType::SALE).await?;
        let vendor_bills =
            self.repository.count_documents(&account_ids, &MoveType::PURCHASE).await?;
        Ok(InvoiceCounts { customer_invoices, vendor_bills })
    }

    /// All figures from a single line fetch.
    pub async fn summary(&self, folder: &Folder) -> Result<AnalyticSummary> {
        let lines = self.lines_for(folder).await?;
        let balance = Balance::from_lines(&lines);
        let (revenue, expense) = partition(lines);
        let invoices = self.invoice_counts(folder).await?;
        Ok(AnalyticSummary { revenue, expense, balance, invoices })
    }
}

fn partition(lines: Vec<AnalyticLine>) -> (Vec<AnalyticLine>, Vec<AnalyticLine>) {
    let mut revenue = Vec::new();
    let mut expense = Vec::new();
    for line in lines {
        if line.amount > 0.0 {
            revenue.push(line);
        } else if line.amount < 0.0 {
            expense.push(line);
        }
    }
    (revenue, expense)
}
