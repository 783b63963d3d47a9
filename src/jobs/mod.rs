//! Batch jobs run outside the request path.

pub mod monitor;
