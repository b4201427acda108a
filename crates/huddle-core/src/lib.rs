//! huddle-core - Core library for Huddle
//!
//! This crate contains the shared models, the optimistic-update reconciler,
//! the realtime client and the backend services used by Huddle interfaces.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod realtime;
pub mod reconcile;
pub mod services;
pub mod state;
pub mod util;
pub mod views;

pub use error::{Error, Result};
pub use state::ConnectionState;
