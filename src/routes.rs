//! HTTP route table.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{
        accounts, businesses, cards, consumers, documents, health, invoices, notes, subscriptions,
    },
    middleware::auth::auth_middleware,
    state::AppState,
};

/// Every `/api/v1` route, without authentication.
fn api_routes() -> Router<AppState> {
    Router::new()
        // Businesses
        .route(
            "/api/v1/businesses",
            post(businesses::create_business).get(businesses::list_businesses),
        )
        .route(
            "/api/v1/businesses/{businessId}",
            get(businesses::get_business)
                .patch(businesses::update_business)
                .delete(businesses::delete_business),
        )
        .route(
            "/api/v1/businesses/{businessId}/kyc",
            post(businesses::submit_kyc),
        )
        .route(
            "/api/v1/csp/businesses/{businessId}/review",
            post(businesses::review_kyc),
        )
        // Consumers
        .route(
            "/api/v1/consumers",
            post(consumers::create_consumer).get(consumers::list_consumers),
        )
        .route(
            "/api/v1/consumers/{consumerId}",
            get(consumers::get_consumer)
                .patch(consumers::update_consumer)
                .delete(consumers::delete_consumer),
        )
        .route(
            "/api/v1/consumers/{consumerId}/kyc",
            post(consumers::submit_kyc),
        )
        .route(
            "/api/v1/csp/consumers/{consumerId}/review",
            post(consumers::review_kyc),
        )
        // Bank accounts and cards
        .route(
            "/api/v1/accounts",
            post(accounts::open_account).get(accounts::list_accounts),
        )
        .route("/api/v1/accounts/{accountId}", get(accounts::get_account))
        .route(
            "/api/v1/accounts/{accountId}/balance",
            get(accounts::get_balance),
        )
        .route(
            "/api/v1/accounts/{accountId}/close",
            post(accounts::close_account),
        )
        .route(
            "/api/v1/accounts/{accountId}/cards",
            post(cards::issue_card).get(cards::list_cards),
        )
        .route("/api/v1/cards/{cardId}", get(cards::get_card))
        .route("/api/v1/cards/{cardId}/status", post(cards::set_card_status))
        // Documents
        .route(
            "/api/v1/documents",
            post(documents::create_document).get(documents::list_documents),
        )
        .route(
            "/api/v1/documents/{documentId}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route(
            "/api/v1/documents/{documentId}/url",
            get(documents::get_document_url),
        )
        // Notes
        .route(
            "/api/v1/notes",
            post(notes::create_note).get(notes::list_notes),
        )
        .route(
            "/api/v1/notes/{noteId}",
            get(notes::get_note)
                .patch(notes::update_note)
                .delete(notes::delete_note),
        )
        // Subscriptions
        .route(
            "/api/v1/businesses/{businessId}/subscriptions",
            post(subscriptions::create_subscription).get(subscriptions::list_subscriptions),
        )
        .route(
            "/api/v1/subscriptions/{subscriptionId}",
            get(subscriptions::get_subscription).patch(subscriptions::update_subscription),
        )
        .route(
            "/api/v1/subscriptions/{subscriptionId}/cancel",
            post(subscriptions::cancel_subscription),
        )
        // Invoices
        .route(
            "/api/v1/businesses/{businessId}/invoices",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route("/api/v1/invoices/{invoiceId}", get(invoices::get_invoice))
        .route(
            "/api/v1/invoices/{invoiceId}/open",
            post(invoices::open_invoice),
        )
        .route(
            "/api/v1/invoices/{invoiceId}/void",
            post(invoices::void_invoice),
        )
        .route(
            "/api/v1/invoices/{invoiceId}/pay",
            post(invoices::pay_invoice),
        )
}

/// Build the application router.
///
/// `/health` is public; everything under `/api/v1` requires an API key.
pub fn create_router(state: AppState) -> Router {
    let authenticated_routes = api_routes().route_layer(axum_middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
