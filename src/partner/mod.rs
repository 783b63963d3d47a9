//! Clients for external partners.

pub mod bank;
