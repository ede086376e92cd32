//! Feature flag evaluation service.
//!
//! - `evaluation` - pure flag evaluation (rules, rollout, variants)
//! - `store` - versioned flag storage with an append-only audit log
//! - `cache` - per-environment read-through snapshot cache
//! - `service` - the operations exposed to callers
//! - `routes` - HTTP surface over the service

pub mod cache;
pub mod config;
pub mod evaluation;
pub mod models;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use evaluation::{evaluate, evaluate_with_options, EnvFallback, EvaluationOptions};
pub use service::{FlagService, ServiceSettings};
