use crate::config::{Config, Credentials};
use crate::db::batch::{ColumnBatch, Row, divide_in_batches};
use crate::db::schema::{ModelDef, SchemaRegistry, quote_ident, qualified_name, validate_ident};
use crate::db::table::{Filter, Table};
use crate::db::value::Value;
use crate::error::{AppError, FetchError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Column, Pool, Postgres, QueryBuilder, Row as _, TypeInfo};
use std::str::FromStr;
use tracing::{debug, error, info, warn};

pub type PgPool = Pool<Postgres>;

/// Upper bound on bind parameters in one PostgreSQL statement.
const PG_BIND_LIMIT: usize = 65_535;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Stored { batch: usize, rows: usize },
    /// Skipped: at least one row collided with an existing key.
    Duplicate { batch: usize, rows: usize },
    Failed {
        batch: usize,
        rows: usize,
        error: String,
    },
}

/// Per-batch result of `insert_dict_in_db`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub table: String,
    pub batches: Vec<BatchOutcome>,
}

impl InsertReport {
    pub fn stored_rows(&self) -> usize {
        self.batches
            .iter()
            .map(|b| match b {
                BatchOutcome::Stored { rows, .. } => *rows,
                _ => 0,
            })
            .sum()
    }

    pub fn skipped_batches(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| !matches!(b, BatchOutcome::Stored { .. }))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a store for `creds`. No connection is made until the first query.
    pub fn connect_lazy(config: &Config, creds: &Credentials) -> Result<Self, AppError> {
        let info = config.connection_info(creds)?;
        let opts = PgConnectOptions::from_str(info.db_url.as_str())?;
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(config.connect_timeout())
            .connect_lazy_with(opts);
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Looks in the catalog, so tables the role holds no privileges on still count.
    pub async fn has_table(&self, schema: &str, table: &str) -> Result<bool, AppError> {
        let exists: (bool,) = sqlx::query_as(
            r#"SELECT EXISTS (
                SELECT 1 FROM pg_catalog.pg_class c
                JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                WHERE n.nspname = $1 AND c.relname = $2
                  AND c.relkind IN ('r', 'p', 'v', 'm', 'f')
            )"#,
        )
        .bind(schema)
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists.0)
    }

    pub async fn has_schema(&self, schema: &str) -> Result<bool, AppError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1)",
        )
        .bind(schema)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists.0)
    }

    async fn ensure_table(&self, model: &ModelDef) -> Result<bool, AppError> {
        if self.has_table(&model.schema_name, &model.table_name).await? {
            return Ok(false);
        }
        // CREATE SCHEMA IF NOT EXISTS still needs CREATE on the database.
        if !self.has_schema(&model.schema_name).await? {
            sqlx::query(&model.create_schema_sql())
                .execute(&self.pool)
                .await?;
        }
        sqlx::query(&model.create_table_sql())
            .execute(&self.pool)
            .await?;
        info!(
            "Model '{}' created successfully in schema '{}'.",
            model.table_name, model.schema_name
        );
        Ok(true)
    }

    /// Declare a model and create its table if it isn't there yet.
    pub async fn create_specific_model(
        &self,
        class_name: &str,
        model_name: &str,
        schema_name: &str,
        column_data: Vec<crate::db::schema::ColumnDef>,
    ) -> Result<ModelDef, AppError> {
        let model = ModelDef::new(class_name, model_name, schema_name, column_data)?;
        self.ensure_table(&model).await?;
        Ok(model)
    }

    /// Create every registered model whose table is missing.
    pub async fn create_new_models(&self, registry: &SchemaRegistry) -> Result<usize, AppError> {
        let mut created = 0;
        for model in registry.models() {
            if self.ensure_table(model).await? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Deduplicate by `id`, then insert in batches of `batch_size` rows, one
    /// transaction per batch. Failed batches are logged and skipped.
    pub async fn insert_dict_in_db(
        &self,
        data: ColumnBatch,
        model: &ModelDef,
        batch_size: usize,
    ) -> InsertReport {
        let table = model.table_name.clone();
        let data = data.remove_duplicate_ids();
        let (names, rows) = data.into_rows();
        let batches = divide_in_batches(rows, batch_size);
        let is_batched = batches.len() > 1;

        let mut report = InsertReport {
            table: table.clone(),
            batches: Vec::with_capacity(batches.len()),
        };
        info!("Starting data storage in DB for table '{table}'.");

        for (idx, batch) in batches.into_iter().enumerate() {
            let batch_no = idx + 1;
            let rows = batch.len();
            match self.insert_batch(model, &names, batch).await {
                Ok(()) => {
                    if is_batched {
                        info!(
                            "Batch number {batch_no} of table '{table}' has been successfully stored in DB."
                        );
                    } else {
                        info!("Table '{table}' has been successfully stored in DB.");
                    }
                    report.batches.push(BatchOutcome::Stored {
                        batch: batch_no,
                        rows,
                    });
                }
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    warn!(
                        batch = batch_no,
                        "Duplicated primary key entries. Skipping. Error log: \n {db_err}"
                    );
                    report.batches.push(BatchOutcome::Duplicate {
                        batch: batch_no,
                        rows,
                    });
                }
                Err(e) => {
                    error!(
                        batch = batch_no,
                        "An error occurred when inserting data into database: {e}."
                    );
                    report.batches.push(BatchOutcome::Failed {
                        batch: batch_no,
                        rows,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    async fn insert_batch(
        &self,
        model: &ModelDef,
        names: &[String],
        rows: Vec<Row>,
    ) -> Result<(), sqlx::Error> {
        if rows.is_empty() || names.is_empty() {
            return Ok(());
        }
        let cols: Vec<String> = names.iter().map(|n| quote_ident(n)).collect();
        let head = format!(
            "INSERT INTO {} ({}) ",
            model.qualified_name(),
            cols.join(", ")
        );
        let rows_per_stmt = (PG_BIND_LIMIT / names.len()).max(1);

        let mut tx = self.pool.begin().await?;
        for chunk in divide_in_batches(rows, rows_per_stmt) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(&head);
            qb.push_values(chunk, |mut b, row| {
                for v in row {
                    match v {
                        Value::Null => {
                            b.push("NULL");
                        }
                        Value::Bool(x) => {
                            b.push_bind(x);
                        }
                        Value::Int(x) => {
                            b.push_bind(x);
                        }
                        Value::Float(x) => {
                            b.push_bind(x);
                        }
                        Value::Text(x) => {
                            b.push_bind(x);
                        }
                    }
                }
            });
            qb.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Probe `schema.table_name` and return a handle that reads it on demand.
    pub async fn get_table_lazy(
        &self,
        schema: &str,
        table_name: &str,
    ) -> Result<LazyTable, FetchError> {
        for ident in [schema, table_name] {
            validate_ident(ident).map_err(|_| FetchError::InvalidIdentifier(ident.to_string()))?;
        }
        let relation = qualified_name(schema, table_name);
        // Zero-row probe surfaces auth, connection and permission errors up front.
        let probe = format!("SELECT * FROM {relation} LIMIT 0");
        let described = sqlx::query(&probe).fetch_all(&self.pool).await?;
        debug!(relation, probed_rows = described.len(), "table probe ok");
        Ok(LazyTable {
            pool: self.pool.clone(),
            relation,
            filter: None,
        })
    }

    /// `SELECT * FROM schema.table_name`, materialized and indexed by `id`.
    pub async fn get_table(&self, schema: &str, table_name: &str) -> Result<Table, FetchError> {
        self.get_table_lazy(schema, table_name).await?.compute().await
    }

    /// Fetch a table and keep rows whose `column` matches `filter`.
    pub async fn filter_table(
        &self,
        schema: &str,
        table_name: &str,
        column: &str,
        filter: Filter,
    ) -> Result<Table, FetchError> {
        self.get_table_lazy(schema, table_name)
            .await?
            .filter(column, filter)?
            .compute()
            .await
    }
}

/// A table that has been checked for access but not read yet.
#[derive(Debug, Clone)]
pub struct LazyTable {
    pool: PgPool,
    relation: String,
    filter: Option<(String, Filter)>,
}

impl LazyTable {
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Restrict the rows `compute` will return.
    pub fn filter(mut self, column: &str, filter: Filter) -> Result<Self, FetchError> {
        validate_ident(column).map_err(|_| FetchError::UnknownColumn(column.to_string()))?;
        self.filter = Some((column.to_string(), filter));
        Ok(self)
    }

    pub async fn compute(self) -> Result<Table, FetchError> {
        let sql = format!("SELECT * FROM {}", self.relation);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let columns: Vec<String> = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => self.describe_columns().await?,
        };
        let values = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        let table = Table::new(columns, values)?;

        match self.filter {
            Some((column, filter)) => table.filter(&column, &filter),
            None => Ok(table),
        }
    }

    async fn describe_columns(&self) -> Result<Vec<String>, FetchError> {
        use sqlx::Executor;
        let sql = format!("SELECT * FROM {}", self.relation);
        let desc = (&self.pool).describe(&sql).await?;
        Ok(desc.columns().iter().map(|c| c.name().to_string()).collect())
    }
}

fn decode_row(row: &PgRow) -> Result<Vec<Value>, sqlx::Error> {
    row.columns()
        .iter()
        .map(|col| {
            let i = col.ordinal();
            let v = match col.type_info().name() {
                "BOOL" => row.try_get::<Option<bool>, _>(i)?.into(),
                "INT2" => row.try_get::<Option<i16>, _>(i)?.map(i64::from).into(),
                "INT4" => row.try_get::<Option<i32>, _>(i)?.map(i64::from).into(),
                "INT8" => row.try_get::<Option<i64>, _>(i)?.into(),
                "FLOAT4" => row.try_get::<Option<f32>, _>(i)?.map(f64::from).into(),
                "FLOAT8" => row.try_get::<Option<f64>, _>(i)?.into(),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
                    row.try_get::<Option<String>, _>(i)?.into()
                }
                "TIMESTAMPTZ" => row
                    .try_get::<Option<DateTime<Utc>>, _>(i)?
                    .map(|t| t.to_rfc3339())
                    .into(),
                "TIMESTAMP" => row
                    .try_get::<Option<NaiveDateTime>, _>(i)?
                    .map(|t| t.to_string())
                    .into(),
                "DATE" => row
                    .try_get::<Option<NaiveDate>, _>(i)?
                    .map(|d| d.to_string())
                    .into(),
                other => {
                    debug!(column = col.name(), ty = other, "unsupported column type; reading as NULL");
                    Value::Null
                }
            };
            Ok(v)
        })
        .collect()
}
