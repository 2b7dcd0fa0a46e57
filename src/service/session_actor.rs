use crate::config::{Config, Credentials};
use crate::db::models::Animal;
use crate::db::postgres::{InsertReport, Store};
use crate::db::schema::{ANIMAL_TABLE, ANIMALS_SCHEMA, SchemaRegistry};
use crate::db::batch::ColumnBatch;
use crate::db::table::{Filter, Table};
use crate::error::{AppError, FetchError};
use crate::service::login::{LoginOutcome, attempt_login};

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{debug, info, warn};

/// Messages handled by the session actor.
#[derive(Debug)]
pub enum SessionMessage {
    /// Try the credentials; replies with the username or the message to show.
    Login(Credentials, RpcReplyPort<Result<String, &'static str>>),
    /// Drop the current session, if any.
    Logout,
    /// Read `schema.table` in full.
    FetchTable(String, String, RpcReplyPort<Result<Table, FetchError>>),
    /// Read `schema.table`, keeping rows whose column matches the filter.
    FilterTable(
        String,
        String,
        String,
        Filter,
        RpcReplyPort<Result<Table, FetchError>>,
    ),
    /// All animals, optionally restricted to one animal class.
    ListAnimals(Option<String>, RpcReplyPort<Result<Vec<Animal>, FetchError>>),
    /// Persist animals into `animals.animal`.
    AddAnimals(Vec<Animal>, RpcReplyPort<Result<InsertReport, AppError>>),
    /// Insert a column batch into the registered table with this name.
    InsertBatch(String, ColumnBatch, RpcReplyPort<Result<InsertReport, AppError>>),
}

/// Handle for interacting with the session actor.
#[derive(Clone)]
pub struct SessionHandle {
    actor: ActorRef<SessionMessage>,
}

fn rpc_err(what: &str, e: impl std::fmt::Display) -> AppError {
    AppError::RactorError(format!("{what} RPC failed: {e}"))
}

impl SessionHandle {
    pub async fn login(&self, creds: Credentials) -> Result<Result<String, &'static str>, AppError> {
        ractor::call!(self.actor, SessionMessage::Login, creds).map_err(|e| rpc_err("Login", e))
    }

    pub async fn logout(&self) {
        let _ = ractor::cast!(self.actor, SessionMessage::Logout);
    }

    pub async fn fetch_table(
        &self,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Table, AppError> {
        let res = ractor::call!(
            self.actor,
            SessionMessage::FetchTable,
            schema.into(),
            table.into()
        )
        .map_err(|e| rpc_err("FetchTable", e))?;
        Ok(res?)
    }

    pub async fn filter_table(
        &self,
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        filter: Filter,
    ) -> Result<Table, AppError> {
        let res = ractor::call!(
            self.actor,
            SessionMessage::FilterTable,
            schema.into(),
            table.into(),
            column.into(),
            filter
        )
        .map_err(|e| rpc_err("FilterTable", e))?;
        Ok(res?)
    }

    pub async fn list_animals(&self, animal_class: Option<String>) -> Result<Vec<Animal>, AppError> {
        let res = ractor::call!(self.actor, SessionMessage::ListAnimals, animal_class)
            .map_err(|e| rpc_err("ListAnimals", e))?;
        Ok(res?)
    }

    pub async fn add_animals(&self, animals: Vec<Animal>) -> Result<InsertReport, AppError> {
        ractor::call!(self.actor, SessionMessage::AddAnimals, animals)
            .map_err(|e| rpc_err("AddAnimals", e))?
    }

    pub async fn insert_batch(
        &self,
        table_name: impl Into<String>,
        batch: ColumnBatch,
    ) -> Result<InsertReport, AppError> {
        ractor::call!(
            self.actor,
            SessionMessage::InsertBatch,
            table_name.into(),
            batch
        )
        .map_err(|e| rpc_err("InsertBatch", e))?
    }

    /// Stop the actor; in-flight replies are dropped and the pool is closed.
    pub fn shutdown(&self) {
        self.actor.stop(Some("shutdown requested".to_string()));
    }
}

struct Session {
    username: String,
    store: Store,
}

struct SessionActorState {
    config: Config,
    registry: SchemaRegistry,
    session: Option<Session>,
}

impl SessionActorState {
    fn store(&self) -> Result<&Store, FetchError> {
        self.session
            .as_ref()
            .map(|s| &s.store)
            .ok_or_else(|| FetchError::NotConnected("no active session".to_string()))
    }
}

struct SessionActor;

#[ractor::async_trait]
impl Actor for SessionActor {
    type Msg = SessionMessage;
    type State = SessionActorState;
    type Arguments = (Config, SchemaRegistry);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        arguments: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let (config, registry) = arguments;
        info!(
            "SessionActor started with {} registered models",
            registry.models().len()
        );
        Ok(SessionActorState {
            config,
            registry,
            session: None,
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(session) = state.session.take() {
            session.store.close().await;
            debug!(username = %session.username, "session closed on stop");
        }
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SessionMessage::Login(creds, rp) => {
                let reply = self.handle_login(state, creds).await;
                let _ = rp.send(reply);
            }
            SessionMessage::Logout => {
                if let Some(session) = state.session.take() {
                    session.store.close().await;
                    info!(username = %session.username, "logged out");
                }
            }
            SessionMessage::FetchTable(schema, table, rp) => {
                let res = match state.store() {
                    Ok(store) => store.get_table(&schema, &table).await,
                    Err(e) => Err(e),
                };
                let _ = rp.send(res);
            }
            SessionMessage::FilterTable(schema, table, column, filter, rp) => {
                let res = match state.store() {
                    Ok(store) => store.filter_table(&schema, &table, &column, filter).await,
                    Err(e) => Err(e),
                };
                let _ = rp.send(res);
            }
            SessionMessage::ListAnimals(animal_class, rp) => {
                let res = match (state.store(), animal_class) {
                    (Err(e), _) => Err(e),
                    (Ok(store), None) => store.get_table(ANIMALS_SCHEMA, ANIMAL_TABLE).await,
                    (Ok(store), Some(class)) => {
                        store
                            .filter_table(
                                ANIMALS_SCHEMA,
                                ANIMAL_TABLE,
                                "animal_class",
                                Filter::Eq(class.into()),
                            )
                            .await
                    }
                };
                let _ = rp.send(res.map(|t| Animal::from_table(&t)));
            }
            SessionMessage::AddAnimals(animals, rp) => {
                let batch = Animal::to_batch(&animals);
                let res = self.insert(state, ANIMAL_TABLE, batch).await;
                let _ = rp.send(res);
            }
            SessionMessage::InsertBatch(table_name, batch, rp) => {
                let res = self.insert(state, &table_name, batch).await;
                let _ = rp.send(res);
            }
        }
        Ok(())
    }
}

impl SessionActor {
    async fn handle_login(
        &self,
        state: &mut SessionActorState,
        creds: Credentials,
    ) -> Result<String, &'static str> {
        if let Some(previous) = state.session.take() {
            previous.store.close().await;
            debug!(username = %previous.username, "replacing previous session");
        }

        match attempt_login(&state.config, &creds).await {
            LoginOutcome::Granted { username, store } => {
                match store.create_new_models(&state.registry).await {
                    Ok(0) => {}
                    Ok(n) => info!(created = n, "missing tables created"),
                    Err(e) => warn!(error = %e, "could not create missing tables"),
                }
                state.session = Some(Session {
                    username: username.clone(),
                    store,
                });
                Ok(username)
            }
            outcome => Err(outcome.message()),
        }
    }

    async fn insert(
        &self,
        state: &SessionActorState,
        table_name: &str,
        batch: ColumnBatch,
    ) -> Result<InsertReport, AppError> {
        let store = state.store()?;
        let model = state.registry.get_model_class_with_name(table_name)?;
        let report = store
            .insert_dict_in_db(batch, model, state.config.batch_size)
            .await;
        if report.skipped_batches() > 0 {
            warn!(
                table = %report.table,
                skipped = report.skipped_batches(),
                "some batches were not stored"
            );
        }
        Ok(report)
    }
}

/// Spawn the session actor and return a handle.
pub async fn spawn(config: Config, registry: SchemaRegistry) -> Result<SessionHandle, AppError> {
    let (actor, _jh) = Actor::spawn(
        Some("SessionActor".to_string()),
        SessionActor,
        (config, registry),
    )
    .await
    .map_err(|e| AppError::RactorError(format!("failed to spawn SessionActor: {e}")))?;
    Ok(SessionHandle { actor })
}
