//! Analytic accounting port

use std::collections::BTreeSet;

use async_trait::async_trait;
use transitdesk_domain::{
    AccountId, AnalyticLine, AnalyticPlan, LedgerAccount, MoveType, PlanId, Result, StageKind,
};

/// Analytic plans, accounts and posted lines.
#[async_trait]
pub trait AnalyticRepository: Send + Sync {
    async fn plan_for_kind(&self, kind: StageKind) -> Result<Option<AnalyticPlan>>;

    async fn create_account(&self, name: &str, plan_id: PlanId) -> Result<LedgerAccount>;

    async fn get_account(&self, id: AccountId) -> Result<Option<LedgerAccount>>;

    async fn rename_account(&self, id: AccountId, name: &str) -> Result<()>;

    /// Lines tagged with at least one of `account_ids`.
    async fn lines_for_accounts(&self, account_ids: &BTreeSet<AccountId>)
        -> Result<Vec<AnalyticLine>>;

    /// Distinct documents of the given types with a line referencing at
    /// least one of `account_ids`.
    async fn count_documents(
        &self,
        account_ids: &BTreeSet<AccountId>,
        move_types: &[MoveType],
    ) -> Result<i64>;
}
