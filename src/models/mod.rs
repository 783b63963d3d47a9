//! Data models representing database entities and API payloads.

/// API key authentication model
pub mod api_key;
pub mod bank_account;
pub mod business;
pub mod consumer;
pub mod document;
pub mod invoice;
pub mod kyc;
pub mod note;
/// Text-backed status enums
pub mod status;
pub mod subscription;
