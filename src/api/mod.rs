//! Backend API access.
//!
//! - [`client`] - `BackendClient` for `/query`, `/query_config`, `/apply_config`
//! - [`types`] - wire types and normalized query parameters
//! - [`config_doc`] - YAML editing of the backend configuration document

mod client;
mod config_doc;
mod types;

pub use client::{ApiError, BackendClient};
pub use config_doc::{ConfigDocError, ConfigDocument, RouteSummary, SourceSummary};
pub use types::{Lookback, QueryParams, QueryRequest, QueryResponse};
