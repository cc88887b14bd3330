//! Federated full-text search, query analytics and autocomplete for a
//! collaborative document review system.

pub mod analytics;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod search;
pub mod suggestions;

pub use error::{AppError, Result};
