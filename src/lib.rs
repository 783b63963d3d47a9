//! Core platform: customer onboarding, banking through the partner bank,
//! documents, notes and billing, plus the queue consumer and batch job
//! that run beside the HTTP API.
//!
//! Three binaries share this library:
//! - `core-platform`: the HTTP API
//! - `document-worker`: consumes storage upload notifications from SQS
//! - `monitor`: pushes changed customers to the monitoring service

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod partner;
pub mod queue;
pub mod routes;
pub mod services;
pub mod shared;
pub mod state;
pub mod storage;
