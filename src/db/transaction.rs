/*!
 * Transactional unit-of-work execution.
 *
 * Every workflow mutation runs as one [`UnitOfWork`] inside one database
 * transaction. On Postgres the transaction is `SERIALIZABLE`; SQLite relies on
 * its database-level write lock. Attempts that lose a serialization conflict
 * are rolled back in full and re-run from scratch.
 */

use crate::config::AppConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use metrics::{counter, histogram};
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait,
    IsolationLevel, QuerySelect, Select, TransactionTrait,
};
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Retry and timeout policy for workflow transactions
#[derive(Debug, Clone)]
pub struct TxPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Linear backoff step; attempt `n` waits `n * backoff`
    pub backoff: Duration,
    /// Upper bound for a single attempt, commit excluded
    pub attempt_timeout: Duration,
}

impl Default for TxPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(25),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&AppConfig> for TxPolicy {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            max_retries: cfg.tx_max_retries,
            backoff: Duration::from_millis(cfg.tx_retry_backoff_ms),
            attempt_timeout: Duration::from_millis(cfg.tx_attempt_timeout_ms),
        }
    }
}

/// A mutation that must be applied atomically.
///
/// `run` may be invoked more than once; it must derive everything it writes
/// from what it reads through `txn`.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Output: Send;

    /// Short operation name used for logs and metric labels
    fn name(&self) -> &'static str;

    async fn run(&self, txn: &DatabaseTransaction) -> Result<Self::Output, ServiceError>;
}

/// Executes `work` in its own transaction, retrying transient conflicts.
pub async fn execute<W>(
    db: &DatabaseConnection,
    policy: &TxPolicy,
    work: &W,
) -> Result<W::Output, ServiceError>
where
    W: UnitOfWork,
{
    let operation = work.name();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let start = Instant::now();
        counter!("healthlink_db.transaction.started", 1, "operation" => operation);

        let result = run_attempt(db, policy, work).await;
        histogram!("healthlink_db.transaction.duration", start.elapsed(), "operation" => operation);

        match result {
            Ok(output) => {
                counter!("healthlink_db.transaction.committed", 1, "operation" => operation);
                debug!(operation, attempt, "Transaction committed in {:?}", start.elapsed());
                return Ok(output);
            }
            Err(err) if err.is_retryable() && attempt <= policy.max_retries => {
                counter!("healthlink_db.transaction.retried", 1, "operation" => operation);
                let delay = policy.backoff * attempt;
                warn!(operation, attempt, error = %err, "Transaction conflict; retrying in {:?}", delay);
                sleep(delay).await;
            }
            Err(err) => {
                counter!("healthlink_db.transaction.rolled_back", 1, "operation" => operation);
                debug!(operation, attempt, error = %err, "Transaction rolled back");
                return Err(err);
            }
        }
    }
}

async fn run_attempt<W>(
    db: &DatabaseConnection,
    policy: &TxPolicy,
    work: &W,
) -> Result<W::Output, ServiceError>
where
    W: UnitOfWork,
{
    let txn = begin(db).await?;
    let outcome = timeout(policy.attempt_timeout, work.run(&txn)).await;

    match outcome {
        Ok(Ok(output)) => {
            txn.commit().await.map_err(ServiceError::from)?;
            Ok(output)
        }
        Ok(Err(err)) => {
            rollback(txn, work.name()).await;
            Err(err)
        }
        Err(_) => {
            rollback(txn, work.name()).await;
            Err(ServiceError::Timeout(format!(
                "{} did not complete within {:?}",
                work.name(),
                policy.attempt_timeout
            )))
        }
    }
}

async fn begin(db: &DatabaseConnection) -> Result<DatabaseTransaction, ServiceError> {
    let txn = match db.get_database_backend() {
        DbBackend::Postgres => {
            db.begin_with_config(
                Some(IsolationLevel::Serializable),
                Some(AccessMode::ReadWrite),
            )
            .await
        }
        _ => db.begin().await,
    };
    txn.map_err(ServiceError::from)
}

/// Adds `FOR UPDATE` on backends with row locks. SQLite serializes writers
/// at the database level and has no lock clause.
pub fn for_update<E: EntityTrait>(select: Select<E>, backend: DbBackend) -> Select<E> {
    match backend {
        DbBackend::Postgres | DbBackend::MySql => select.lock_exclusive(),
        _ => select,
    }
}

async fn rollback(txn: DatabaseTransaction, operation: &str) {
    if let Err(err) = txn.rollback().await {
        warn!(operation, error = %err, "Rollback failed; connection will be discarded");
    }
}
