use std::time::Duration;

use bb8::{Pool, RunError};
use bb8_postgres::PostgresConnectionManager;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
pub use tokio_postgres::types::{ToSql, Type as PgType};
use tokio_postgres::{config::SslMode, Config, Error as PgError};
use tokio::{task, time::timeout};
use tracing::{debug, error};

use crate::manifest::storage::DatabaseDetails;

#[derive(thiserror::Error, Debug)]
pub enum PostgresConnectionError {
    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] tokio_postgres::Error),

    #[error("Can not connect to the database please make sure your connection string is correct")]
    CanNotConnectToDatabase,

    #[error("Could not parse connection string make sure it is correctly formatted")]
    CouldNotParseConnectionString,

    #[error("Could not create tls connector")]
    CouldNotCreateTlsConnector,
}

#[derive(thiserror::Error, Debug)]
pub enum PostgresError {
    #[error("PgError {0}")]
    PgError(#[from] PgError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] RunError<tokio_postgres::Error>),
}

/// A single pooled postgres connection.
///
/// The pool is capped at one connection so every statement of a run goes through the
/// same session, one at a time.
pub struct PostgresClient {
    pool: Pool<PostgresConnectionManager<MakeTlsConnector>>,
}

fn connection_config(details: &DatabaseDetails) -> Result<Config, PostgresConnectionError> {
    let mut config: Config = details
        .url
        .parse()
        .map_err(|_| PostgresConnectionError::CouldNotParseConnectionString)?;

    if let Some((username, password)) = details.credentials() {
        config.user(username);
        if let Some(password) = password {
            config.password(password);
        }
    }

    if details.disable_ssl() {
        config.ssl_mode(SslMode::Disable);
    }

    Ok(config)
}

impl PostgresClient {
    pub async fn new(details: &DatabaseDetails) -> Result<Self, PostgresConnectionError> {
        async fn _new(
            details: &DatabaseDetails,
            disable_ssl: bool,
        ) -> Result<PostgresClient, PostgresConnectionError> {
            let mut config = connection_config(details)?;

            if disable_ssl {
                config.ssl_mode(SslMode::Disable);
            }

            let connector = TlsConnector::builder()
                .build()
                .map_err(|_| PostgresConnectionError::CouldNotCreateTlsConnector)?;
            let tls_connector = MakeTlsConnector::new(connector);

            let (client, connection) =
                match timeout(Duration::from_millis(5000), config.connect(tls_connector.clone()))
                    .await
                {
                    Ok(Ok((client, connection))) => (client, connection),
                    Ok(Err(e)) => {
                        // retry without ssl if ssl has been attempted and failed
                        if !disable_ssl
                            && config.get_ssl_mode() != SslMode::Disable
                            && !details.url.contains("sslmode=require")
                        {
                            debug!("Connecting with ssl failed ({}), retrying without ssl", e);
                            return Box::pin(_new(details, true)).await;
                        }
                        error!("Error connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                    Err(e) => {
                        error!("Timeout connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                };

            let connection_handle = task::spawn(connection);

            if client.query_one("SELECT 1", &[]).await.is_err() {
                return Err(PostgresConnectionError::CanNotConnectToDatabase);
            }

            drop(client);
            match connection_handle.await {
                Ok(Ok(())) => (),
                Ok(Err(_)) | Err(_) => return Err(PostgresConnectionError::CanNotConnectToDatabase),
            }

            let manager = PostgresConnectionManager::new(config, tls_connector);

            let pool = Pool::builder().max_size(1).build(manager).await?;

            Ok(PostgresClient { pool })
        }

        _new(details, false).await
    }

    /// Prepares `query` once, executes it once with `params` and commits, all inside
    /// one transaction. Returns the number of rows the statement touched.
    ///
    /// Nothing is committed if any step fails; the transaction is rolled back when it
    /// is dropped.
    pub async fn execute_in_transaction(
        &self,
        query: &str,
        parameter_types: &[PgType],
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, PostgresError> {
        let mut conn = self.pool.get().await?;
        let transaction = conn.transaction().await?;

        let statement = transaction.prepare_typed(query, parameter_types).await?;
        let count = transaction.execute(&statement, params).await?;

        transaction.commit().await?;

        Ok(count)
    }
}
