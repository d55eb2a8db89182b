//! feedboard: a terminal dashboard for aggregated feed backends.
//!
//! Items are fetched from a backend over HTTP, grouped client side by a
//! label, and tracked as read locally. The crate also ships a small HTTP
//! proxy that forwards `/api/*` requests to a backend chosen per request.

pub mod api;
pub mod app;
pub mod config;
pub mod grouping;
pub mod model;
pub mod preferences;
pub mod proxy;
pub mod read_state;
pub mod selection;
pub mod session;
pub mod storage;
pub mod ui;
pub mod util;
