use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Warehouse errors, classified once at the driver boundary so callers can
/// branch on meaning instead of driver internals.
#[derive(Debug, Error)]
pub enum DbError {
    /// Schema or table created concurrently by someone else.
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// The session is gone; reconnecting may help.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("SQL error: {0}")]
    Sql(String),

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),
}

impl DbError {
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, DbError::ConnectionLost(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, DbError::AlreadyExists(_))
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return DbError::ConnectionLost(err.to_string());
        }

        if let Some(code) = err.code() {
            if is_duplicate_object(code) {
                return DbError::AlreadyExists(err.to_string());
            }
            if is_connection_failure(code) {
                return DbError::ConnectionLost(err.to_string());
            }
            return DbError::Sql(err.to_string());
        }

        let io_failure = std::error::Error::source(&err)
            .is_some_and(|source| source.downcast_ref::<std::io::Error>().is_some());
        if io_failure {
            DbError::ConnectionLost(err.to_string())
        } else {
            DbError::Sql(err.to_string())
        }
    }
}

impl From<native_tls::Error> for DbError {
    fn from(err: native_tls::Error) -> Self {
        DbError::Tls(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::ConnectionLost(err.to_string())
    }
}

fn is_duplicate_object(code: &SqlState) -> bool {
    matches!(
        *code,
        SqlState::DUPLICATE_SCHEMA | SqlState::DUPLICATE_TABLE | SqlState::DUPLICATE_OBJECT
    )
}

fn is_connection_failure(code: &SqlState) -> bool {
    matches!(
        *code,
        SqlState::ADMIN_SHUTDOWN
            | SqlState::CRASH_SHUTDOWN
            | SqlState::CANNOT_CONNECT_NOW
            | SqlState::CONNECTION_FAILURE
            | SqlState::CONNECTION_DOES_NOT_EXIST
            | SqlState::CONNECTION_EXCEPTION
            | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
            | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
            | SqlState::TOO_MANY_CONNECTIONS
    )
}
