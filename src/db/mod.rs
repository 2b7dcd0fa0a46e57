//! Database module: data access for the animal logger.
//!
//! Layout:
//! - `value.rs`: dynamically typed cells
//! - `batch.rs`: column batches, deduplication and row batching
//! - `schema.rs`: static table models and the registry resolving them
//! - `table.rs`: materialized query results and filtering
//! - `models.rs`: credential and animal records
//! - `postgres.rs`: the PostgreSQL-backed store

pub mod batch;
pub mod models;
pub mod postgres;
pub mod schema;
pub mod table;
pub mod value;

pub use batch::{ColumnBatch, DEFAULT_BATCH_SIZE, divide_in_batches};
pub use models::{Animal, DbCredential, Taxonomy};
pub use postgres::{BatchOutcome, InsertReport, LazyTable, PgPool, Store};
pub use schema::{ColumnDef, ColumnType, ModelDef, SchemaRegistry};
pub use table::{Filter, Table};
pub use value::Value;
