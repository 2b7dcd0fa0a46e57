use crate::config::{Config, Credentials};
use crate::db::models::DbCredential;
use crate::db::postgres::Store;
use crate::db::schema::{CREDENTIALS_SCHEMA, LOGIN_TABLE};
use crate::error::FetchError;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

pub const MSG_REJECTED: &str = "Invalid username or password.";

#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials matched a row; the store stays connected as this user.
    Granted { username: String, store: Store },
    /// The table was read but no row matched.
    Rejected(&'static str),
    /// The credential table could not be read.
    Failed(&'static str),
}

impl LoginOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, LoginOutcome::Granted { .. })
    }

    /// Text for the login page; empty on success.
    pub fn message(&self) -> &'static str {
        match self {
            LoginOutcome::Granted { .. } => "",
            LoginOutcome::Rejected(msg) | LoginOutcome::Failed(msg) => *msg,
        }
    }
}

/// Case-sensitive match of `creds` against the credential rows.
pub fn find_user<'a>(rows: &'a [DbCredential], creds: &Credentials) -> Option<&'a DbCredential> {
    rows.iter().find(|row| {
        row.username == creds.username
            && bool::from(row.password.as_bytes().ct_eq(creds.password.as_bytes()))
    })
}

pub(crate) fn outcome_from_fetch(err: &FetchError) -> LoginOutcome {
    warn!(error = %err, "credential table fetch failed");
    LoginOutcome::Failed(err.user_message())
}

/// Connect as the submitted user and look them up in `credentials.login_app`.
pub async fn attempt_login(config: &Config, creds: &Credentials) -> LoginOutcome {
    info!(username = %creds.username, "Attempting to login");

    let store = match Store::connect_lazy(config, creds) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "could not build connection for login");
            return LoginOutcome::Failed(crate::error::MSG_LOG_IN);
        }
    };

    let table = match store.get_table(CREDENTIALS_SCHEMA, LOGIN_TABLE).await {
        Ok(table) => table,
        Err(e) => {
            store.close().await;
            return outcome_from_fetch(&e);
        }
    };

    let rows = DbCredential::from_table(&table);
    match find_user(&rows, creds) {
        Some(user) => {
            info!(username = %user.username, "login granted");
            LoginOutcome::Granted {
                username: user.username.clone(),
                store,
            }
        }
        None => {
            info!(username = %creds.username, "no matching credentials");
            store.close().await;
            LoginOutcome::Rejected(MSG_REJECTED)
        }
    }
}
