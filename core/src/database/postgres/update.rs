use async_trait::async_trait;
use bb8::RunError;
use tokio_postgres::error::SqlState;
use tracing::debug;

use crate::{
    database::postgres::{
        client::{PgType, PostgresClient, PostgresError, ToSql},
        query_builder::build_bulk_update_sql,
    },
    input::Identifier,
    manifest::storage::TargetDetails,
    updater::{BackendError, UpdateBackend},
};

/// SQLSTATE codes for conditions where the failed transaction did not commit and the
/// same batch can be sent again: serialization failure, deadlock, lock timeout,
/// statement timeout and server overload.
pub fn is_retryable_sql_state(state: &SqlState) -> bool {
    *state == SqlState::T_R_SERIALIZATION_FAILURE
        || *state == SqlState::T_R_DEADLOCK_DETECTED
        || *state == SqlState::LOCK_NOT_AVAILABLE
        || *state == SqlState::QUERY_CANCELED
        || *state == SqlState::INSUFFICIENT_RESOURCES
        || *state == SqlState::TOO_MANY_CONNECTIONS
}

fn is_retryable_pg_error(error: &tokio_postgres::Error) -> bool {
    error.code().is_some_and(is_retryable_sql_state)
}

impl From<PostgresError> for BackendError {
    fn from(error: PostgresError) -> Self {
        let retryable = match &error {
            PostgresError::PgError(e) => is_retryable_pg_error(e),
            PostgresError::ConnectionPoolError(RunError::User(e)) => is_retryable_pg_error(e),
            PostgresError::ConnectionPoolError(_) => false,
        };

        if retryable {
            BackendError::retryable(error)
        } else {
            BackendError::fatal(error)
        }
    }
}

/// Writes `target.value_column` for every identifier of a batch in one transaction.
pub struct PostgresUpdateBackend {
    client: PostgresClient,
    target: TargetDetails,
    sql: String,
}

impl PostgresUpdateBackend {
    pub fn new(client: PostgresClient, target: TargetDetails) -> Self {
        let sql = build_bulk_update_sql(&target);
        debug!("Bulk update statement: {}", sql);
        Self { client, target, sql }
    }
}

#[async_trait]
impl UpdateBackend for PostgresUpdateBackend {
    async fn apply(&mut self, batch: &[Identifier]) -> Result<(), BackendError> {
        let values: Vec<String> = batch.iter().map(|id| self.target.render_value(*id)).collect();
        let params: [&(dyn ToSql + Sync); 2] = [&batch, &values];

        let updated = self
            .client
            .execute_in_transaction(&self.sql, &[PgType::INT8_ARRAY, PgType::TEXT_ARRAY], &params)
            .await?;

        if updated < batch.len() as u64 {
            debug!(
                "Batch of {} ids starting at {} matched only {} rows",
                batch.len(),
                batch[0],
                updated
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_states_are_retryable() {
        for code in ["40001", "40P01", "55P03", "57014", "53000", "53300"] {
            assert!(is_retryable_sql_state(&SqlState::from_code(code)), "{code} should retry");
        }
    }

    #[test]
    fn test_other_states_are_fatal() {
        for code in ["42601", "42P01", "23505", "23502", "08006", "57P01", "XX000"] {
            assert!(!is_retryable_sql_state(&SqlState::from_code(code)), "{code} should not retry");
        }
    }

    #[test]
    fn test_pool_timeout_is_fatal() {
        let error: BackendError = PostgresError::ConnectionPoolError(RunError::TimedOut).into();
        assert!(!error.is_retryable());
    }
}
