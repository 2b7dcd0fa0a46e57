pub mod assets;
pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod logging;
pub mod service;

pub use config::{Config, Credentials};
pub use error::{AppError, FetchError};
