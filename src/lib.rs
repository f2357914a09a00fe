pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod models;
pub mod portfolio;
pub mod quotes;
pub mod store;
pub mod validation;
pub mod valuation;
pub mod worker;

pub use error::{Result, TrackerError};
