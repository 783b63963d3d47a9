//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and calls to the
//! partner bank and document store.

pub mod account_service;
pub mod business_service;
pub mod consumer_service;
pub mod document_service;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod invoice_service;
pub mod note_service;
pub mod owner_service;
pub mod sql;
pub mod subscription_service;
