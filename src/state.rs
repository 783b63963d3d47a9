//! Shared application state handed to every handler.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{db::DbPool, partner::bank::BankAdapter, storage::DocumentStore};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub bank: BankAdapter,
    pub documents: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(pool: DbPool, bank: BankAdapter, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            pool,
            bank,
            documents,
        }
    }
}

/// Lets handlers and middleware that only touch the database extract
/// `State<DbPool>` directly.
impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
