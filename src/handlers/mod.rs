//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to a service
//! 3. Returns HTTP response (JSON, status code)

/// Bank account endpoints
pub mod accounts;
pub mod businesses;
pub mod cards;
pub mod consumers;
pub mod documents;
pub mod extract;
pub mod health;
pub mod invoices;
pub mod notes;
pub mod subscriptions;
