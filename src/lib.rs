//! Mergington High School extracurricular activities backend.
//!
//! Lists activities, authenticates staff and students with cookie sessions,
//! and lets authorized users sign students up for activities or remove them.

pub mod activities;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod policy;

pub use config::Config;
pub use error::ApiError;
