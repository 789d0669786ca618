//! PostgreSQL storage for the rewards core.
//!
//! Server deployments connect with DATABASE_URL; schema is applied from
//! embedded migrations on startup.

use anyhow::Result;
use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::{NoTls, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Budget, BudgetScope, Environment, ExternalStatus, IssuanceKind, IssuanceStatus, LedgerEntry,
    NewAward, NewIssuance, Participant, PointsBalance, ProviderConfig, RewardIssuance, SyncStatus,
};
use crate::store::RewardStore;

const DB_POOL_MAX_SIZE: usize = 20;
const DB_QUERY_TIMEOUT_SECS: u64 = 30;

const ISSUANCE_COLUMNS: &str = "id, user_id, workspace_id, challenge_id, kind, amount, sku_id, currency, \
     status, external_status, external_transaction_id, external_adjustment_id, \
     error_message, metadata, issued_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Create storage from DATABASE_URL
    pub async fn new(database_url: &str) -> Result<Self> {
        use deadpool_postgres::{ManagerConfig, PoolConfig, RecyclingMethod};
        use std::time::Duration;

        let mut config = Config::new();
        config.url = Some(database_url.to_string());

        config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        config.pool = Some(PoolConfig {
            max_size: DB_POOL_MAX_SIZE,
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(Duration::from_secs(DB_QUERY_TIMEOUT_SECS)),
                create: Some(Duration::from_secs(10)),
                recycle: Some(Duration::from_secs(30)),
            },
            ..Default::default()
        });

        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;

        // Test connection
        let client = pool.get().await?;
        client
            .execute(
                &format!("SET statement_timeout = '{}s'", DB_QUERY_TIMEOUT_SECS),
                &[],
            )
            .await?;

        info!(
            "Connected to PostgreSQL (pool_size: {}, query_timeout: {}s)",
            DB_POOL_MAX_SIZE, DB_QUERY_TIMEOUT_SECS
        );

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create storage from DATABASE_URL environment variable
    pub async fn from_env() -> Result<Self> {
        let url =
            std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;
        Self::new(&url).await
    }

    /// Run embedded migrations
    async fn run_migrations(&self) -> Result<()> {
        let client = self.pool.get().await?;

        let exists: bool = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_name = 'schema_migrations')",
                &[],
            )
            .await?
            .get(0);

        if !exists {
            let migration_sql = include_str!("../migrations/001_schema.sql");
            client.batch_execute(migration_sql).await?;
            info!("Applied migration 001_schema");
        }

        Ok(())
    }
}

fn row_to_issuance(row: &Row) -> RewardIssuance {
    let kind: String = row.get(4);
    let status: String = row.get(8);
    let external_status: String = row.get(9);
    RewardIssuance {
        id: row.get(0),
        user_id: row.get(1),
        workspace_id: row.get(2),
        challenge_id: row.get(3),
        kind: IssuanceKind::parse(&kind).unwrap(),
        amount: row.get(5),
        sku_id: row.get(6),
        currency: row.get(7),
        status: IssuanceStatus::parse(&status).unwrap(),
        external_status: ExternalStatus::parse(&external_status).unwrap(),
        external_transaction_id: row.get(10),
        external_adjustment_id: row.get(11),
        error_message: row.get(12),
        metadata: row.get(13),
        issued_at: row.get(14),
        created_at: row.get(15),
        updated_at: row.get(16),
    }
}

fn row_to_ledger_entry(row: &Row) -> LedgerEntry {
    LedgerEntry {
        id: row.get(0),
        workspace_id: row.get(1),
        challenge_id: row.get(2),
        to_user_id: row.get(3),
        amount: row.get(4),
        submission_id: row.get(5),
        actor_id: row.get(6),
        reason: row.get(7),
        issuance_id: row.get(8),
        created_at: row.get(9),
    }
}

fn row_to_budget(row: &Row) -> Budget {
    Budget {
        workspace_id: row.get(0),
        challenge_id: row.get(1),
        total_budget: row.get(2),
        allocated: row.get(3),
    }
}

fn row_to_participant(row: &Row) -> Participant {
    let sync_status: String = row.get(13);
    Participant {
        user_id: row.get(0),
        workspace_id: row.get(1),
        email: row.get(2),
        first_name: row.get(3),
        last_name: row.get(4),
        phone: row.get(5),
        address1: row.get(6),
        address2: row.get(7),
        city: row.get(8),
        state: row.get(9),
        zip: row.get(10),
        country: row.get(11),
        external_participant_id: row.get(12),
        sync_status: SyncStatus::parse(&sync_status).unwrap(),
        last_sync_at: row.get(14),
    }
}

#[async_trait]
impl RewardStore for PgStore {
    async fn set_budget(&self, scope: &BudgetScope, total_budget: i64) -> Result<Budget> {
        let total = total_budget.max(0);
        let client = self.pool.get().await?;

        let row = client
            .query_one(
                "INSERT INTO budgets (workspace_id, challenge_id, total_budget, allocated)
                 VALUES ($1, $2, $3, 0)
                 ON CONFLICT (workspace_id, COALESCE(challenge_id, '')) DO UPDATE SET
                    total_budget = EXCLUDED.total_budget
                 RETURNING workspace_id, challenge_id, total_budget, allocated",
                &[&scope.workspace_id, &scope.challenge_id, &total],
            )
            .await?;

        Ok(row_to_budget(&row))
    }

    async fn get_budget(&self, scope: &BudgetScope) -> Result<Option<Budget>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT workspace_id, challenge_id, total_budget, allocated FROM budgets
                 WHERE workspace_id = $1 AND COALESCE(challenge_id, '') = COALESCE($2, '')",
                &[&scope.workspace_id, &scope.challenge_id],
            )
            .await?;
        Ok(row.map(|r| row_to_budget(&r)))
    }

    async fn award(&self, award: &NewAward) -> Result<LedgerEntry> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        // Narrowest existing scope wins; no budget row means unconstrained.
        let mut accounted = false;
        if let Some(challenge_id) = &award.challenge_id {
            accounted = tx
                .execute(
                    "UPDATE budgets SET allocated = allocated + $1
                     WHERE workspace_id = $2 AND challenge_id = $3",
                    &[&award.amount, &award.workspace_id, challenge_id],
                )
                .await?
                > 0;
        }
        if !accounted {
            tx.execute(
                "UPDATE budgets SET allocated = allocated + $1
                 WHERE workspace_id = $2 AND challenge_id IS NULL",
                &[&award.amount, &award.workspace_id],
            )
            .await?;
        }

        tx.execute(
            "INSERT INTO points_balances (user_id, workspace_id, total_points, available_points)
             VALUES ($1, $2, $3, $3)
             ON CONFLICT (user_id, workspace_id) DO UPDATE SET
                total_points = points_balances.total_points + EXCLUDED.total_points,
                available_points = points_balances.available_points + EXCLUDED.available_points",
            &[&award.to_user_id, &award.workspace_id, &award.amount],
        )
        .await?;

        let row = tx
            .query_one(
                "INSERT INTO ledger_entries
                    (workspace_id, challenge_id, to_user_id, amount, submission_id, actor_id, reason, issuance_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING id, created_at",
                &[
                    &award.workspace_id,
                    &award.challenge_id,
                    &award.to_user_id,
                    &award.amount,
                    &award.submission_id,
                    &award.actor_id,
                    &award.reason,
                    &award.issuance_id,
                ],
            )
            .await?;

        tx.commit().await?;

        Ok(LedgerEntry {
            id: row.get(0),
            workspace_id: award.workspace_id.clone(),
            challenge_id: award.challenge_id.clone(),
            to_user_id: award.to_user_id.clone(),
            amount: award.amount,
            submission_id: award.submission_id.clone(),
            actor_id: award.actor_id.clone(),
            reason: award.reason.clone(),
            issuance_id: award.issuance_id,
            created_at: row.get(1),
        })
    }

    async fn get_balance(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<PointsBalance>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT user_id, workspace_id, total_points, available_points
                 FROM points_balances WHERE user_id = $1 AND workspace_id = $2",
                &[&user_id, &workspace_id],
            )
            .await?;
        Ok(row.map(|r| PointsBalance {
            user_id: r.get(0),
            workspace_id: r.get(1),
            total_points: r.get(2),
            available_points: r.get(3),
        }))
    }

    async fn ledger_entries(&self, workspace_id: &str, limit: i64) -> Result<Vec<LedgerEntry>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, workspace_id, challenge_id, to_user_id, amount, submission_id, actor_id, reason, issuance_id, created_at
                 FROM ledger_entries WHERE workspace_id = $1 ORDER BY id DESC LIMIT $2",
                &[&workspace_id, &limit],
            )
            .await?;
        Ok(rows.iter().map(row_to_ledger_entry).collect())
    }

    async fn create_issuance(&self, new: &NewIssuance) -> Result<(RewardIssuance, bool)> {
        let client = self.pool.get().await?;

        let completion = new.dedupe_on_challenge && new.challenge_id.is_some();
        if completion {
            let existing = client
                .query_opt(
                    &format!(
                        "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances
                         WHERE user_id = $1 AND challenge_id = $2 AND completion_trigger"
                    ),
                    &[&new.user_id, &new.challenge_id],
                )
                .await?;
            if let Some(row) = existing {
                return Ok((row_to_issuance(&row), false));
            }
        }

        let id = Uuid::new_v4();
        let inserted = client
            .execute(
                "INSERT INTO reward_issuances
                    (id, user_id, workspace_id, challenge_id, kind, amount, sku_id, currency, metadata, completion_trigger)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT DO NOTHING",
                &[
                    &id,
                    &new.user_id,
                    &new.workspace_id,
                    &new.challenge_id,
                    &new.kind.as_str(),
                    &new.amount,
                    &new.sku_id,
                    &new.currency,
                    &new.metadata,
                    &completion,
                ],
            )
            .await?;

        // A concurrent duplicate may have won the partial unique index;
        // read back whichever row exists.
        let row = if completion {
            client
                .query_one(
                    &format!(
                        "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances
                         WHERE user_id = $1 AND challenge_id = $2 AND completion_trigger"
                    ),
                    &[&new.user_id, &new.challenge_id],
                )
                .await?
        } else {
            client
                .query_one(
                    &format!("SELECT {ISSUANCE_COLUMNS} FROM reward_issuances WHERE id = $1"),
                    &[&id],
                )
                .await?
        };
        Ok((row_to_issuance(&row), inserted > 0))
    }

    async fn set_external_ref(
        &self,
        id: Uuid,
        external_transaction_id: Option<&str>,
        external_adjustment_id: Option<&str>,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE reward_issuances
                 SET external_transaction_id = $2, external_adjustment_id = $3, updated_at = NOW()
                 WHERE id = $1",
                &[&id, &external_transaction_id, &external_adjustment_id],
            )
            .await?;
        Ok(())
    }

    async fn get_issuance(&self, id: Uuid) -> Result<Option<RewardIssuance>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {ISSUANCE_COLUMNS} FROM reward_issuances WHERE id = $1"),
                &[&id],
            )
            .await?;
        Ok(row.map(|r| row_to_issuance(&r)))
    }

    async fn begin_processing(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE reward_issuances
                 SET status = 'PROCESSING', external_status = 'PROCESSING', updated_at = NOW()
                 WHERE id = $1 AND status = 'PENDING'",
                &[&id],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn mark_issued(
        &self,
        id: Uuid,
        external_transaction_id: Option<&str>,
        external_adjustment_id: Option<&str>,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE reward_issuances
                 SET status = 'ISSUED', external_status = 'COMPLETED',
                     external_transaction_id = $2, external_adjustment_id = $3,
                     error_message = NULL, issued_at = NOW(), updated_at = NOW()
                 WHERE id = $1",
                &[&id, &external_transaction_id, &external_adjustment_id],
            )
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE reward_issuances
                 SET status = 'FAILED', external_status = 'FAILED', error_message = $2, updated_at = NOW()
                 WHERE id = $1 AND status != 'ISSUED'",
                &[&id, &error_message],
            )
            .await?;
        Ok(())
    }

    async fn reset_for_retry(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE reward_issuances
                 SET status = 'PENDING', external_status = 'PENDING',
                     external_transaction_id = NULL, external_adjustment_id = NULL,
                     error_message = NULL, updated_at = NOW()
                 WHERE id = $1 AND status = 'FAILED'",
                &[&id],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn unreconciled_issuances(&self, limit: i64) -> Result<Vec<RewardIssuance>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances
                     WHERE external_status IN ('PENDING', 'PROCESSING')
                       AND (external_transaction_id IS NOT NULL OR external_adjustment_id IS NOT NULL)
                     ORDER BY updated_at ASC LIMIT $1"
                ),
                &[&limit],
            )
            .await?;
        Ok(rows.iter().map(row_to_issuance).collect())
    }

    async fn find_by_external_ref(&self, external_id: &str) -> Result<Option<RewardIssuance>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {ISSUANCE_COLUMNS} FROM reward_issuances
                     WHERE external_transaction_id = $1 OR external_adjustment_id = $1"
                ),
                &[&external_id],
            )
            .await?;
        Ok(row.map(|r| row_to_issuance(&r)))
    }

    async fn apply_external_status(
        &self,
        id: Uuid,
        status: ExternalStatus,
        detail: Option<&str>,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        match status {
            ExternalStatus::Completed => {
                client
                    .execute(
                        "UPDATE reward_issuances
                         SET external_status = 'COMPLETED', status = 'ISSUED',
                             issued_at = COALESCE(issued_at, NOW()), updated_at = NOW()
                         WHERE id = $1",
                        &[&id],
                    )
                    .await?;
            }
            ExternalStatus::Failed => {
                client
                    .execute(
                        "UPDATE reward_issuances
                         SET external_status = 'FAILED', status = 'FAILED',
                             error_message = $2, updated_at = NOW()
                         WHERE id = $1",
                        &[&id, &detail],
                    )
                    .await?;
            }
            other => {
                client
                    .execute(
                        "UPDATE reward_issuances SET external_status = $2, updated_at = NOW()
                         WHERE id = $1",
                        &[&id, &other.as_str()],
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn get_participant(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<Participant>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT user_id, workspace_id, email, first_name, last_name, phone,
                        address1, address2, city, state, zip, country,
                        external_participant_id, sync_status, last_sync_at
                 FROM participants WHERE user_id = $1 AND workspace_id = $2",
                &[&user_id, &workspace_id],
            )
            .await?;
        Ok(row.map(|r| row_to_participant(&r)))
    }

    async fn upsert_participant(&self, p: &Participant) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO participants
                    (user_id, workspace_id, email, first_name, last_name, phone,
                     address1, address2, city, state, zip, country,
                     external_participant_id, sync_status, last_sync_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                 ON CONFLICT (user_id, workspace_id) DO UPDATE SET
                    email = EXCLUDED.email,
                    first_name = EXCLUDED.first_name,
                    last_name = EXCLUDED.last_name,
                    phone = EXCLUDED.phone,
                    address1 = EXCLUDED.address1,
                    address2 = EXCLUDED.address2,
                    city = EXCLUDED.city,
                    state = EXCLUDED.state,
                    zip = EXCLUDED.zip,
                    country = EXCLUDED.country",
                &[
                    &p.user_id,
                    &p.workspace_id,
                    &p.email,
                    &p.first_name,
                    &p.last_name,
                    &p.phone,
                    &p.address1,
                    &p.address2,
                    &p.city,
                    &p.state,
                    &p.zip,
                    &p.country,
                    &p.external_participant_id,
                    &p.sync_status.as_str(),
                    &p.last_sync_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn set_sync_state(
        &self,
        user_id: &str,
        workspace_id: &str,
        status: SyncStatus,
        external_participant_id: Option<&str>,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        let stamp_sync = status == SyncStatus::Synced;
        client
            .execute(
                "UPDATE participants
                 SET sync_status = $3,
                     external_participant_id = COALESCE($4, external_participant_id),
                     last_sync_at = CASE WHEN $5 THEN NOW() ELSE last_sync_at END
                 WHERE user_id = $1 AND workspace_id = $2",
                &[
                    &user_id,
                    &workspace_id,
                    &status.as_str(),
                    &external_participant_id,
                    &stamp_sync,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_provider_config(&self, workspace_id: &str) -> Result<Option<ProviderConfig>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT workspace_id, program_id, api_key, environment, enabled
                 FROM provider_configs WHERE workspace_id = $1",
                &[&workspace_id],
            )
            .await?;
        Ok(row.map(|r| {
            let environment: String = r.get(3);
            ProviderConfig {
                workspace_id: r.get(0),
                program_id: r.get(1),
                api_key: r.get(2),
                environment: Environment::parse(&environment).unwrap(),
                enabled: r.get(4),
            }
        }))
    }

    async fn set_provider_config(&self, config: &ProviderConfig) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO provider_configs (workspace_id, program_id, api_key, environment, enabled)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (workspace_id) DO UPDATE SET
                    program_id = EXCLUDED.program_id,
                    api_key = EXCLUDED.api_key,
                    environment = EXCLUDED.environment,
                    enabled = EXCLUDED.enabled",
                &[
                    &config.workspace_id,
                    &config.program_id,
                    &config.api_key,
                    &config.environment.as_str(),
                    &config.enabled,
                ],
            )
            .await?;
        Ok(())
    }
}
