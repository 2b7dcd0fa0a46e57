use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

pub const MSG_INVALID_CREDENTIALS: &str = "Invalid credentials. Try again.";
pub const MSG_LOG_IN: &str = "Please, log in with your credentials.";
pub const MSG_NO_RIGHTS: &str = "You have no rights to the database.";
pub const MSG_UNEXPECTED: &str = "Unexpected database error.";

#[derive(Debug, ThisError)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("No configuration files found; nothing to load")]
    ConfigNotLoaded,

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Model with table name '{0}' not found")]
    ModelNotFound(String),

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("{0}")]
    Fetch(#[from] FetchError),
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(Box::new(e))
    }
}

/// Failure while reading a table, classified by what the user should be told.
#[derive(Debug, ThisError)]
pub enum FetchError {
    /// Authentication rejected, or the server reply could not be decoded.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(#[source] SqlxError),

    /// Server unreachable, pool exhausted or otherwise not connected.
    #[error("not connected: {0}")]
    NotConnected(String),

    /// Insufficient privilege, or the relation is not visible to this role.
    #[error("permission denied: {0}")]
    NoRights(#[source] SqlxError),

    #[error("table has no column '{0}'")]
    UnknownColumn(String),

    #[error("table has no 'id' column to index by")]
    MissingIndex,

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("unexpected database error: {0}")]
    Other(#[source] SqlxError),
}

impl FetchError {
    /// The message shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::InvalidCredentials(_) => MSG_INVALID_CREDENTIALS,
            FetchError::NotConnected(_) => MSG_LOG_IN,
            FetchError::NoRights(_) => MSG_NO_RIGHTS,
            FetchError::UnknownColumn(_)
            | FetchError::MissingIndex
            | FetchError::InvalidIdentifier(_)
            | FetchError::Other(_) => MSG_UNEXPECTED,
        }
    }
}

/// Coarse class of a PostgreSQL SQLSTATE code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlStateClass {
    Authentication,
    Connection,
    Permission,
    Other,
}

/// Classify a SQLSTATE into the buckets the fetch boundary cares about.
pub fn classify_sqlstate(code: &str) -> SqlStateClass {
    match code {
        // invalid_authorization_specification, invalid_password
        "28000" | "28P01" => SqlStateClass::Authentication,
        // insufficient_privilege, undefined_table, invalid_schema_name
        "42501" | "42P01" | "3F000" => SqlStateClass::Permission,
        // invalid_catalog_name, too_many_connections, cannot_connect_now
        "3D000" | "53300" | "57P03" => SqlStateClass::Connection,
        c if c.starts_with("08") => SqlStateClass::Connection,
        _ => SqlStateClass::Other,
    }
}

impl From<SqlxError> for FetchError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::Database(db_err) => {
                let class = db_err
                    .code()
                    .map(|c| classify_sqlstate(&c))
                    .unwrap_or(SqlStateClass::Other);
                match class {
                    SqlStateClass::Authentication => FetchError::InvalidCredentials(err),
                    SqlStateClass::Permission => FetchError::NoRights(err),
                    SqlStateClass::Connection => FetchError::NotConnected(err.to_string()),
                    SqlStateClass::Other => FetchError::Other(err),
                }
            }
            SqlxError::Decode(_) | SqlxError::ColumnDecode { .. } => {
                FetchError::InvalidCredentials(err)
            }
            SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::Protocol(_)
            | SqlxError::Configuration(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed => FetchError::NotConnected(err.to_string()),
            _ => FetchError::Other(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlstate_classes() {
        assert_eq!(classify_sqlstate("28P01"), SqlStateClass::Authentication);
        assert_eq!(classify_sqlstate("42501"), SqlStateClass::Permission);
        assert_eq!(classify_sqlstate("42P01"), SqlStateClass::Permission);
        assert_eq!(classify_sqlstate("08006"), SqlStateClass::Connection);
        assert_eq!(classify_sqlstate("3D000"), SqlStateClass::Connection);
        assert_eq!(classify_sqlstate("23505"), SqlStateClass::Other);
    }

    #[test]
    fn connection_failures_ask_to_log_in() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = FetchError::from(SqlxError::Io(io));
        assert_eq!(err.user_message(), "Please, log in with your credentials.");

        let err = FetchError::from(SqlxError::PoolTimedOut);
        assert_eq!(err.user_message(), MSG_LOG_IN);
    }

    #[test]
    fn decode_failures_report_invalid_credentials() {
        let err = FetchError::from(SqlxError::Decode("bad utf-8".into()));
        assert_eq!(err.user_message(), "Invalid credentials. Try again.");
    }

    #[test]
    fn permission_message_is_exact() {
        let err = FetchError::NoRights(SqlxError::RowNotFound);
        assert_eq!(err.user_message(), "You have no rights to the database.");
    }

    #[test]
    fn unclassified_errors_get_generic_message() {
        let err = FetchError::from(SqlxError::RowNotFound);
        assert!(matches!(err, FetchError::Other(_)));
        assert_eq!(err.user_message(), MSG_UNEXPECTED);
    }
}
