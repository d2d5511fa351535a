use std::sync::Arc;

use axum::{
    Router,
    middleware,
    routing::{get, post},
};

use crate::handlers::expenses::{analytics, get_expenses, replace_expenses};
use crate::middleware::request_context::track_request;
use crate::service::expense_store::ExpenseStore;

/// Shared handler state; the store is the only shared resource.
pub struct AppState<S> {
    pub store: Arc<S>,
}

impl<S> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

pub fn expense_router<S: ExpenseStore>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            "/expenses/add_update/{expense_date}",
            get(get_expenses::<S>).post(replace_expenses::<S>),
        )
        .route("/expenses/analytics/", post(analytics::<S>))
        .route("/expenses/analytics", post(analytics::<S>))
        .layer(middleware::from_fn(track_request))
        .with_state(state)
}
