//! Budget ledger operations.
//!
//! Award is the only mutation of shared budget/balance state; the store
//! executes it as one transaction so concurrent awards serialize without
//! lost updates or partial application.

use std::sync::Arc;

use tracing::info;

use crate::error::RewardError;
use crate::models::{Budget, BudgetScope, LedgerEntry, NewAward, PointsBalance};
use crate::store::RewardStore;

pub struct Ledger {
    store: Arc<dyn RewardStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn RewardStore>) -> Self {
        Self { store }
    }

    /// Award points: debit the narrowest budget scope, credit the recipient
    /// balance and append a ledger entry, atomically.
    ///
    /// Budget enforcement is deliberately soft: an award that pushes
    /// `allocated` past `total_budget` is recorded, not rejected. A strict
    /// deployment would gate on `allocated + amount <= total_budget` and
    /// return [`RewardError::BudgetExceeded`] here.
    pub async fn award(&self, award: &NewAward) -> Result<LedgerEntry, RewardError> {
        if award.amount <= 0 {
            return Err(RewardError::InvalidAmount);
        }

        let entry = self
            .store
            .award(award)
            .await
            .map_err(RewardError::storage)?;

        info!(
            "Awarded {} points to {} in workspace {} (entry {})",
            entry.amount, entry.to_user_id, entry.workspace_id, entry.id
        );
        Ok(entry)
    }

    /// Administrative budget upsert; negative totals clamp to zero and
    /// `allocated` is never modified.
    pub async fn set_budget(
        &self,
        scope: &BudgetScope,
        total_budget: i64,
    ) -> Result<Budget, RewardError> {
        let budget = self
            .store
            .set_budget(scope, total_budget)
            .await
            .map_err(RewardError::storage)?;
        info!(
            "Budget for {}/{} set to {}",
            budget.workspace_id,
            budget.challenge_id.as_deref().unwrap_or("-"),
            budget.total_budget
        );
        Ok(budget)
    }

    pub async fn get_budget(&self, scope: &BudgetScope) -> Result<Option<Budget>, RewardError> {
        self.store
            .get_budget(scope)
            .await
            .map_err(RewardError::storage)
    }

    pub async fn get_balance(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<PointsBalance>, RewardError> {
        self.store
            .get_balance(user_id, workspace_id)
            .await
            .map_err(RewardError::storage)
    }

    pub async fn ledger_entries(
        &self,
        workspace_id: &str,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, RewardError> {
        self.store
            .ledger_entries(workspace_id, limit)
            .await
            .map_err(RewardError::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_store::SqliteStore;

    fn ledger() -> Ledger {
        Ledger::new(Arc::new(SqliteStore::in_memory().unwrap()))
    }

    fn award_of(amount: i64) -> NewAward {
        NewAward {
            workspace_id: "w1".into(),
            challenge_id: None,
            to_user_id: "u1".into(),
            amount,
            submission_id: Some("s1".into()),
            actor_id: Some("reviewer-1".into()),
            reason: "approved submission".into(),
            issuance_id: None,
        }
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let ledger = ledger();
        assert!(matches!(
            ledger.award(&award_of(0)).await,
            Err(RewardError::InvalidAmount)
        ));
        assert!(matches!(
            ledger.award(&award_of(-5)).await,
            Err(RewardError::InvalidAmount)
        ));
        // Nothing was recorded.
        assert!(ledger.ledger_entries("w1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn two_awards_accumulate_against_budget_and_balance() {
        let ledger = ledger();
        ledger
            .set_budget(&BudgetScope::workspace("w1"), 1000)
            .await
            .unwrap();

        ledger.award(&award_of(50)).await.unwrap();
        ledger.award(&award_of(50)).await.unwrap();

        let balance = ledger.get_balance("u1", "w1").await.unwrap().unwrap();
        assert_eq!(balance.total_points, 100);
        assert_eq!(balance.available_points, 100);

        let budget = ledger
            .get_budget(&BudgetScope::workspace("w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(budget.total_budget, 1000);
        assert_eq!(budget.allocated, 100);

        assert_eq!(ledger.ledger_entries("w1", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn over_allocation_is_recorded_not_rejected() {
        let ledger = ledger();
        ledger
            .set_budget(&BudgetScope::workspace("w1"), 30)
            .await
            .unwrap();

        ledger.award(&award_of(50)).await.unwrap();

        let budget = ledger
            .get_budget(&BudgetScope::workspace("w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(budget.allocated, 50);
        assert!(budget.allocated > budget.total_budget);
    }
}
