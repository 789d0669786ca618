//! Embedded SQLite storage.
//!
//! Used for local deployments and the test suite; the server runs on
//! [`crate::pg_store::PgStore`]. Both implement [`RewardStore`].

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    Budget, BudgetScope, ExternalStatus, IssuanceKind, IssuanceStatus, LedgerEntry, NewAward,
    NewIssuance, Participant, PointsBalance, ProviderConfig, RewardIssuance, SyncStatus,
};
use crate::store::RewardStore;

const SCHEMA: &str = include_str!("../migrations/sqlite_schema.sql");

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn award_in_tx(tx: &Transaction<'_>, award: &NewAward) -> Result<LedgerEntry> {
        // Narrowest existing scope wins; no budget row means unconstrained.
        let mut accounted = false;
        if let Some(challenge_id) = &award.challenge_id {
            accounted = tx.execute(
                "UPDATE budgets SET allocated = allocated + ?1
                 WHERE workspace_id = ?2 AND challenge_id = ?3",
                params![award.amount, award.workspace_id, challenge_id],
            )? > 0;
        }
        if !accounted {
            tx.execute(
                "UPDATE budgets SET allocated = allocated + ?1
                 WHERE workspace_id = ?2 AND challenge_id IS NULL",
                params![award.amount, award.workspace_id],
            )?;
        }

        tx.execute(
            "INSERT INTO points_balances (user_id, workspace_id, total_points, available_points)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(user_id, workspace_id) DO UPDATE SET
                total_points = total_points + excluded.total_points,
                available_points = available_points + excluded.available_points",
            params![award.to_user_id, award.workspace_id, award.amount],
        )?;

        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO ledger_entries
                (workspace_id, challenge_id, to_user_id, amount, submission_id, actor_id, reason, issuance_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                award.workspace_id,
                award.challenge_id,
                award.to_user_id,
                award.amount,
                award.submission_id,
                award.actor_id,
                award.reason,
                award.issuance_id.map(|id| id.to_string()),
                created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        Ok(LedgerEntry {
            id,
            workspace_id: award.workspace_id.clone(),
            challenge_id: award.challenge_id.clone(),
            to_user_id: award.to_user_id.clone(),
            amount: award.amount,
            submission_id: award.submission_id.clone(),
            actor_id: award.actor_id.clone(),
            reason: award.reason.clone(),
            issuance_id: award.issuance_id,
            created_at,
        })
    }
}

fn parse_ts(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .unwrap()
        .with_timezone(&Utc)
}

fn row_to_issuance(row: &Row<'_>) -> rusqlite::Result<RewardIssuance> {
    Ok(RewardIssuance {
        id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
        user_id: row.get(1)?,
        workspace_id: row.get(2)?,
        challenge_id: row.get(3)?,
        kind: IssuanceKind::parse(&row.get::<_, String>(4)?).unwrap(),
        amount: row.get(5)?,
        sku_id: row.get(6)?,
        currency: row.get(7)?,
        status: IssuanceStatus::parse(&row.get::<_, String>(8)?).unwrap(),
        external_status: ExternalStatus::parse(&row.get::<_, String>(9)?).unwrap(),
        external_transaction_id: row.get(10)?,
        external_adjustment_id: row.get(11)?,
        error_message: row.get(12)?,
        metadata: serde_json::from_str(&row.get::<_, String>(13)?)
            .unwrap_or(serde_json::Value::Null),
        issued_at: row.get::<_, Option<String>>(14)?.map(parse_ts),
        created_at: parse_ts(row.get(15)?),
        updated_at: parse_ts(row.get(16)?),
    })
}

const ISSUANCE_COLUMNS: &str = "id, user_id, workspace_id, challenge_id, kind, amount, sku_id, currency, \
     status, external_status, external_transaction_id, external_adjustment_id, \
     error_message, metadata, issued_at, created_at, updated_at";

fn row_to_ledger_entry(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        challenge_id: row.get(2)?,
        to_user_id: row.get(3)?,
        amount: row.get(4)?,
        submission_id: row.get(5)?,
        actor_id: row.get(6)?,
        reason: row.get(7)?,
        issuance_id: row
            .get::<_, Option<String>>(8)?
            .map(|s| Uuid::parse_str(&s).unwrap()),
        created_at: parse_ts(row.get(9)?),
    })
}

fn row_to_participant(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        user_id: row.get(0)?,
        workspace_id: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        phone: row.get(5)?,
        address1: row.get(6)?,
        address2: row.get(7)?,
        city: row.get(8)?,
        state: row.get(9)?,
        zip: row.get(10)?,
        country: row.get(11)?,
        external_participant_id: row.get(12)?,
        sync_status: SyncStatus::parse(&row.get::<_, String>(13)?).unwrap(),
        last_sync_at: row.get::<_, Option<String>>(14)?.map(parse_ts),
    })
}

#[async_trait]
impl RewardStore for SqliteStore {
    async fn set_budget(&self, scope: &BudgetScope, total_budget: i64) -> Result<Budget> {
        let total = total_budget.max(0);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO budgets (workspace_id, challenge_id, total_budget, allocated)
             VALUES (?1, ?2, ?3, 0)
             ON CONFLICT(workspace_id, IFNULL(challenge_id, '')) DO UPDATE SET
                total_budget = excluded.total_budget",
            params![scope.workspace_id, scope.challenge_id, total],
        )?;

        let budget = conn.query_row(
            "SELECT workspace_id, challenge_id, total_budget, allocated FROM budgets
             WHERE workspace_id = ?1 AND IFNULL(challenge_id, '') = IFNULL(?2, '')",
            params![scope.workspace_id, scope.challenge_id],
            |row| {
                Ok(Budget {
                    workspace_id: row.get(0)?,
                    challenge_id: row.get(1)?,
                    total_budget: row.get(2)?,
                    allocated: row.get(3)?,
                })
            },
        )?;
        Ok(budget)
    }

    async fn get_budget(&self, scope: &BudgetScope) -> Result<Option<Budget>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT workspace_id, challenge_id, total_budget, allocated FROM budgets
             WHERE workspace_id = ?1 AND IFNULL(challenge_id, '') = IFNULL(?2, '')",
        )?;
        let budget = stmt
            .query_row(params![scope.workspace_id, scope.challenge_id], |row| {
                Ok(Budget {
                    workspace_id: row.get(0)?,
                    challenge_id: row.get(1)?,
                    total_budget: row.get(2)?,
                    allocated: row.get(3)?,
                })
            })
            .ok();
        Ok(budget)
    }

    async fn award(&self, award: &NewAward) -> Result<LedgerEntry> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let entry = Self::award_in_tx(&tx, award)?;
        tx.commit()?;
        Ok(entry)
    }

    async fn get_balance(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<PointsBalance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, workspace_id, total_points, available_points FROM points_balances
             WHERE user_id = ?1 AND workspace_id = ?2",
        )?;
        let balance = stmt
            .query_row(params![user_id, workspace_id], |row| {
                Ok(PointsBalance {
                    user_id: row.get(0)?,
                    workspace_id: row.get(1)?,
                    total_points: row.get(2)?,
                    available_points: row.get(3)?,
                })
            })
            .ok();
        Ok(balance)
    }

    async fn ledger_entries(&self, workspace_id: &str, limit: i64) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, challenge_id, to_user_id, amount, submission_id, actor_id, reason, issuance_id, created_at
             FROM ledger_entries WHERE workspace_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![workspace_id, limit], row_to_ledger_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn create_issuance(&self, new: &NewIssuance) -> Result<(RewardIssuance, bool)> {
        let conn = self.conn.lock().unwrap();

        let completion = new.dedupe_on_challenge && new.challenge_id.is_some();
        if completion {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances
                 WHERE user_id = ?1 AND challenge_id = ?2 AND completion_trigger = 1"
            ))?;
            if let Ok(existing) = stmt.query_row(
                params![new.user_id, new.challenge_id],
                row_to_issuance,
            ) {
                return Ok((existing, false));
            }
        }

        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let inserted = conn.execute(
            "INSERT INTO reward_issuances
                (id, user_id, workspace_id, challenge_id, kind, amount, sku_id, currency,
                 status, external_status, metadata, completion_trigger, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'PENDING', 'PENDING', ?9, ?10, ?11, ?11)
             ON CONFLICT DO NOTHING",
            params![
                id.to_string(),
                new.user_id,
                new.workspace_id,
                new.challenge_id,
                new.kind.as_str(),
                new.amount,
                new.sku_id,
                new.currency,
                serde_json::to_string(&new.metadata)?,
                completion,
                now,
            ],
        )?;

        // The partial unique index may have swallowed a concurrent duplicate;
        // read back whichever row won.
        let mut stmt = if completion {
            conn.prepare(&format!(
                "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances
                 WHERE user_id = ?1 AND challenge_id = ?2 AND completion_trigger = 1"
            ))?
        } else {
            conn.prepare(&format!(
                "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances WHERE id = ?1"
            ))?
        };
        let issuance = if completion {
            stmt.query_row(params![new.user_id, new.challenge_id], row_to_issuance)?
        } else {
            stmt.query_row(params![id.to_string()], row_to_issuance)?
        };
        Ok((issuance, inserted > 0))
    }

    async fn set_external_ref(
        &self,
        id: Uuid,
        external_transaction_id: Option<&str>,
        external_adjustment_id: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE reward_issuances
             SET external_transaction_id = ?2, external_adjustment_id = ?3, updated_at = ?4
             WHERE id = ?1",
            params![
                id.to_string(),
                external_transaction_id,
                external_adjustment_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_issuance(&self, id: Uuid) -> Result<Option<RewardIssuance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances WHERE id = ?1"
        ))?;
        let issuance = stmt
            .query_row(params![id.to_string()], row_to_issuance)
            .ok();
        Ok(issuance)
    }

    async fn begin_processing(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE reward_issuances
             SET status = 'PROCESSING', external_status = 'PROCESSING', updated_at = ?2
             WHERE id = ?1 AND status = 'PENDING'",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(updated == 1)
    }

    async fn mark_issued(
        &self,
        id: Uuid,
        external_transaction_id: Option<&str>,
        external_adjustment_id: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE reward_issuances
             SET status = 'ISSUED', external_status = 'COMPLETED',
                 external_transaction_id = ?2, external_adjustment_id = ?3,
                 error_message = NULL, issued_at = ?4, updated_at = ?4
             WHERE id = ?1",
            params![id.to_string(), external_transaction_id, external_adjustment_id, now],
        )?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE reward_issuances
             SET status = 'FAILED', external_status = 'FAILED', error_message = ?2, updated_at = ?3
             WHERE id = ?1 AND status != 'ISSUED'",
            params![id.to_string(), error_message, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn reset_for_retry(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE reward_issuances
             SET status = 'PENDING', external_status = 'PENDING',
                 external_transaction_id = NULL, external_adjustment_id = NULL,
                 error_message = NULL, updated_at = ?2
             WHERE id = ?1 AND status = 'FAILED'",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(updated == 1)
    }

    async fn unreconciled_issuances(&self, limit: i64) -> Result<Vec<RewardIssuance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances
             WHERE external_status IN ('PENDING', 'PROCESSING')
               AND (external_transaction_id IS NOT NULL OR external_adjustment_id IS NOT NULL)
             ORDER BY updated_at ASC LIMIT ?1"
        ))?;
        let issuances = stmt
            .query_map(params![limit], row_to_issuance)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(issuances)
    }

    async fn find_by_external_ref(&self, external_id: &str) -> Result<Option<RewardIssuance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances
             WHERE external_transaction_id = ?1 OR external_adjustment_id = ?1"
        ))?;
        let issuance = stmt.query_row(params![external_id], row_to_issuance).ok();
        Ok(issuance)
    }

    async fn apply_external_status(
        &self,
        id: Uuid,
        status: ExternalStatus,
        detail: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        match status {
            ExternalStatus::Completed => {
                conn.execute(
                    "UPDATE reward_issuances
                     SET external_status = 'COMPLETED', status = 'ISSUED',
                         issued_at = IFNULL(issued_at, ?2), updated_at = ?2
                     WHERE id = ?1",
                    params![id.to_string(), now],
                )?;
            }
            ExternalStatus::Failed => {
                conn.execute(
                    "UPDATE reward_issuances
                     SET external_status = 'FAILED', status = 'FAILED',
                         error_message = ?2, updated_at = ?3
                     WHERE id = ?1",
                    params![id.to_string(), detail, now],
                )?;
            }
            other => {
                conn.execute(
                    "UPDATE reward_issuances SET external_status = ?2, updated_at = ?3
                     WHERE id = ?1",
                    params![id.to_string(), other.as_str(), now],
                )?;
            }
        }
        Ok(())
    }

    async fn get_participant(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<Participant>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, workspace_id, email, first_name, last_name, phone,
                    address1, address2, city, state, zip, country,
                    external_participant_id, sync_status, last_sync_at
             FROM participants WHERE user_id = ?1 AND workspace_id = ?2",
        )?;
        let participant = stmt
            .query_row(params![user_id, workspace_id], row_to_participant)
            .ok();
        Ok(participant)
    }

    async fn upsert_participant(&self, p: &Participant) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO participants
                (user_id, workspace_id, email, first_name, last_name, phone,
                 address1, address2, city, state, zip, country,
                 external_participant_id, sync_status, last_sync_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(user_id, workspace_id) DO UPDATE SET
                email = excluded.email,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                phone = excluded.phone,
                address1 = excluded.address1,
                address2 = excluded.address2,
                city = excluded.city,
                state = excluded.state,
                zip = excluded.zip,
                country = excluded.country",
            params![
                p.user_id,
                p.workspace_id,
                p.email,
                p.first_name,
                p.last_name,
                p.phone,
                p.address1,
                p.address2,
                p.city,
                p.state,
                p.zip,
                p.country,
                p.external_participant_id,
                p.sync_status.as_str(),
                p.last_sync_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    async fn set_sync_state(
        &self,
        user_id: &str,
        workspace_id: &str,
        status: SyncStatus,
        external_participant_id: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let last_sync_at = match status {
            SyncStatus::Synced => Some(Utc::now().to_rfc3339()),
            _ => None,
        };
        conn.execute(
            "UPDATE participants
             SET sync_status = ?3,
                 external_participant_id = IFNULL(?4, external_participant_id),
                 last_sync_at = IFNULL(?5, last_sync_at)
             WHERE user_id = ?1 AND workspace_id = ?2",
            params![user_id, workspace_id, status.as_str(), external_participant_id, last_sync_at],
        )?;
        Ok(())
    }

    async fn get_provider_config(&self, workspace_id: &str) -> Result<Option<ProviderConfig>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT workspace_id, program_id, api_key, environment, enabled
             FROM provider_configs WHERE workspace_id = ?1",
        )?;
        let config = stmt
            .query_row(params![workspace_id], |row| {
                Ok(ProviderConfig {
                    workspace_id: row.get(0)?,
                    program_id: row.get(1)?,
                    api_key: row.get(2)?,
                    environment: crate::models::Environment::parse(&row.get::<_, String>(3)?)
                        .unwrap(),
                    enabled: row.get(4)?,
                })
            })
            .ok();
        Ok(config)
    }

    async fn set_provider_config(&self, config: &ProviderConfig) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO provider_configs (workspace_id, program_id, api_key, environment, enabled)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(workspace_id) DO UPDATE SET
                program_id = excluded.program_id,
                api_key = excluded.api_key,
                environment = excluded.environment,
                enabled = excluded.enabled",
            params![
                config.workspace_id,
                config.program_id,
                config.api_key,
                config.environment.as_str(),
                config.enabled,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Environment;
    use std::sync::Arc;

    fn new_award(workspace: &str, user: &str, amount: i64) -> NewAward {
        NewAward {
            workspace_id: workspace.into(),
            challenge_id: None,
            to_user_id: user.into(),
            amount,
            submission_id: None,
            actor_id: None,
            reason: "test award".into(),
            issuance_id: None,
        }
    }

    fn new_issuance(user: &str, challenge: Option<&str>, dedupe: bool) -> NewIssuance {
        NewIssuance {
            user_id: user.into(),
            workspace_id: "w1".into(),
            challenge_id: challenge.map(Into::into),
            kind: IssuanceKind::Points,
            amount: Some(50),
            sku_id: None,
            currency: None,
            metadata: serde_json::Value::Null,
            dedupe_on_challenge: dedupe,
        }
    }

    #[tokio::test]
    async fn award_credits_balance_and_appends_ledger() {
        let store = SqliteStore::in_memory().unwrap();
        store.award(&new_award("w1", "u1", 50)).await.unwrap();
        store.award(&new_award("w1", "u1", 50)).await.unwrap();

        let balance = store.get_balance("u1", "w1").await.unwrap().unwrap();
        assert_eq!(balance.total_points, 100);
        assert_eq!(balance.available_points, 100);

        let entries = store.ledger_entries("w1", 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.amount == 50));
    }

    #[tokio::test]
    async fn award_debits_workspace_budget_when_present() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .set_budget(&BudgetScope::workspace("w1"), 1000)
            .await
            .unwrap();

        store.award(&new_award("w1", "u1", 50)).await.unwrap();
        store.award(&new_award("w1", "u2", 50)).await.unwrap();

        let budget = store
            .get_budget(&BudgetScope::workspace("w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(budget.total_budget, 1000);
        assert_eq!(budget.allocated, 100);
    }

    #[tokio::test]
    async fn challenge_budget_is_preferred_over_workspace_budget() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .set_budget(&BudgetScope::workspace("w1"), 1000)
            .await
            .unwrap();
        store
            .set_budget(&BudgetScope::challenge("w1", "c1"), 200)
            .await
            .unwrap();

        let mut award = new_award("w1", "u1", 30);
        award.challenge_id = Some("c1".into());
        store.award(&award).await.unwrap();

        let challenge = store
            .get_budget(&BudgetScope::challenge("w1", "c1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(challenge.allocated, 30);

        let workspace = store
            .get_budget(&BudgetScope::workspace("w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(workspace.allocated, 0);
    }

    #[tokio::test]
    async fn missing_budget_row_skips_accounting() {
        let store = SqliteStore::in_memory().unwrap();
        store.award(&new_award("w1", "u1", 50)).await.unwrap();
        assert!(store
            .get_budget(&BudgetScope::workspace("w1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn failed_award_leaves_no_partial_state() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .set_budget(&BudgetScope::workspace("w1"), 1000)
            .await
            .unwrap();

        // amount = 0 passes the budget and balance statements but violates
        // the ledger CHECK constraint, forcing a rollback of all three.
        let result = store.award(&new_award("w1", "u1", 0)).await;
        assert!(result.is_err());

        let budget = store
            .get_budget(&BudgetScope::workspace("w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(budget.allocated, 0);
        assert!(store.get_balance("u1", "w1").await.unwrap().is_none());
        assert!(store.ledger_entries("w1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_awards_to_one_scope_sum_exactly() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .set_budget(&BudgetScope::workspace("w1"), 10_000)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.award(&new_award("w1", "u1", 10 + i)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let expected: i64 = (0..20).map(|i| 10 + i).sum();
        let budget = store
            .get_budget(&BudgetScope::workspace("w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(budget.allocated, expected);

        let balance = store.get_balance("u1", "w1").await.unwrap().unwrap();
        assert_eq!(balance.total_points, expected);
        assert_eq!(store.ledger_entries("w1", 100).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn set_budget_clamps_negative_and_keeps_allocated() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .set_budget(&BudgetScope::workspace("w1"), 500)
            .await
            .unwrap();
        store.award(&new_award("w1", "u1", 100)).await.unwrap();

        let budget = store
            .set_budget(&BudgetScope::workspace("w1"), -10)
            .await
            .unwrap();
        assert_eq!(budget.total_budget, 0);
        assert_eq!(budget.allocated, 100);
    }

    async fn create(store: &SqliteStore, new: &NewIssuance) -> RewardIssuance {
        store.create_issuance(new).await.unwrap().0
    }

    #[tokio::test]
    async fn completion_issuance_is_created_once() {
        let store = SqliteStore::in_memory().unwrap();
        let (first, created) = store
            .create_issuance(&new_issuance("u1", Some("c1"), true))
            .await
            .unwrap();
        assert!(created);
        let (second, created_again) = store
            .create_issuance(&new_issuance("u1", Some("c1"), true))
            .await
            .unwrap();
        assert!(!created_again);
        assert_eq!(first.id, second.id);

        // Different challenge or user gets its own issuance.
        let other = create(&store, &new_issuance("u1", Some("c2"), true)).await;
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn begin_processing_claims_exactly_once() {
        let store = SqliteStore::in_memory().unwrap();
        let issuance = create(&store, &new_issuance("u1", None, false)).await;

        assert!(store.begin_processing(issuance.id).await.unwrap());
        // Second claim observes PROCESSING and backs off.
        assert!(!store.begin_processing(issuance.id).await.unwrap());

        let current = store.get_issuance(issuance.id).await.unwrap().unwrap();
        assert_eq!(current.status, IssuanceStatus::Processing);
        assert_eq!(current.external_status, ExternalStatus::Processing);
    }

    #[tokio::test]
    async fn retry_resets_only_failed_issuances() {
        let store = SqliteStore::in_memory().unwrap();
        let issuance = create(&store, &new_issuance("u1", None, false)).await;

        assert!(!store.reset_for_retry(issuance.id).await.unwrap());

        store.begin_processing(issuance.id).await.unwrap();
        store.mark_failed(issuance.id, "provider 503").await.unwrap();

        let failed = store.get_issuance(issuance.id).await.unwrap().unwrap();
        assert_eq!(failed.status, IssuanceStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("provider 503"));

        assert!(store.reset_for_retry(issuance.id).await.unwrap());
        let reset = store.get_issuance(issuance.id).await.unwrap().unwrap();
        assert_eq!(reset.status, IssuanceStatus::Pending);
        assert!(reset.error_message.is_none());
        assert!(reset.external_id().is_none());
    }

    #[tokio::test]
    async fn unreconciled_requires_an_external_id() {
        let store = SqliteStore::in_memory().unwrap();
        let a = create(&store, &new_issuance("u1", None, false)).await;
        let b = create(&store, &new_issuance("u2", None, false)).await;

        // a: submitted but not terminal -> needs reconciliation
        store.begin_processing(a.id).await.unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "UPDATE reward_issuances SET external_adjustment_id = 'adj-1' WHERE id = ?1",
                params![a.id.to_string()],
            )
            .unwrap();
        }
        // b: never dispatched, no external id
        store.begin_processing(b.id).await.unwrap();

        let pending = store.unreconciled_issuances(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);
    }

    #[tokio::test]
    async fn apply_external_status_promotes_and_demotes() {
        let store = SqliteStore::in_memory().unwrap();
        let issuance = create(&store, &new_issuance("u1", None, false)).await;
        store.begin_processing(issuance.id).await.unwrap();

        store
            .apply_external_status(issuance.id, ExternalStatus::Completed, None)
            .await
            .unwrap();
        let issued = store.get_issuance(issuance.id).await.unwrap().unwrap();
        assert_eq!(issued.status, IssuanceStatus::Issued);
        assert!(issued.issued_at.is_some());

        let other = create(&store, &new_issuance("u2", None, false)).await;
        store.begin_processing(other.id).await.unwrap();
        store
            .apply_external_status(other.id, ExternalStatus::Failed, Some("card declined"))
            .await
            .unwrap();
        let failed = store.get_issuance(other.id).await.unwrap().unwrap();
        assert_eq!(failed.status, IssuanceStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("card declined"));
    }

    #[tokio::test]
    async fn provider_config_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_provider_config("w1").await.unwrap().is_none());

        store
            .set_provider_config(&ProviderConfig {
                workspace_id: "w1".into(),
                program_id: "prog-1".into(),
                api_key: "key".into(),
                environment: Environment::Sandbox,
                enabled: true,
            })
            .await
            .unwrap();

        let config = store.get_provider_config("w1").await.unwrap().unwrap();
        assert_eq!(config.program_id, "prog-1");
        assert_eq!(config.environment, Environment::Sandbox);
        assert!(config.enabled);
    }
}
