//! # Assetry
//!
//! An organizational asset-tracking backend, usable both as a standalone
//! binary and as a library.
//!
//! Users belong to departments, departments belong to entities, and asset
//! classes and assets form trees scoped to a department. The core modules
//! keep those trees acyclic ([`hierarchy`]), decide who may touch what
//! ([`scope`], [`permission`]) and drive the asset and async-task state
//! machines ([`lifecycle`], [`tasks`]).
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! assetry = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use assetry::server::{AppState, create_router};
//! use assetry::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/assetry.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), None));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `assetry` binary. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod lifecycle;
pub mod permission;
pub mod scope;
pub mod server;
pub mod service;
pub mod store;
pub mod tasks;
pub mod types;
