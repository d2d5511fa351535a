use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use tracing::info;

use crate::error::LedgerError;
use crate::middleware::request_context::RequestContext;
use crate::router::AppState;
use crate::service::analytics::category_breakdown;
use crate::service::expense_store::ExpenseStore;
use crate::types::expense::validate_expenses;
use crate::types::{CategoryShare, DateRange, Expense, MessageResponse};

pub const REPLACED_MESSAGE: &str = "Expenses added/updated successfully";

/// `GET /expenses/add_update/{expense_date}`
pub async fn get_expenses<S: ExpenseStore>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path(expense_date): Path<NaiveDate>,
) -> Result<Json<Vec<Expense>>, LedgerError> {
    info!(
        request_id = %ctx.request_id,
        pipeline = ctx.pipeline,
        date = %expense_date,
        "Fetching expenses"
    );
    let expenses = state.store.expenses_for_date(&ctx, expense_date).await?;
    info!(
        request_id = %ctx.request_id,
        pipeline = ctx.pipeline,
        count = expenses.len(),
        "Expenses fetched"
    );
    Ok(Json(expenses))
}

/// `POST /expenses/add_update/{expense_date}`: replace, never merge.
pub async fn replace_expenses<S: ExpenseStore>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path(expense_date): Path<NaiveDate>,
    Json(expenses): Json<Vec<Expense>>,
) -> Result<Json<MessageResponse>, LedgerError> {
    info!(
        request_id = %ctx.request_id,
        pipeline = ctx.pipeline,
        date = %expense_date,
        count = expenses.len(),
        "Updating expenses"
    );
    // Nothing is touched unless the whole list fits the table.
    validate_expenses(&expenses)?;
    state
        .store
        .replace_expenses(&ctx, expense_date, &expenses)
        .await?;
    Ok(Json(MessageResponse {
        message: REPLACED_MESSAGE.to_string(),
    }))
}

/// `POST /expenses/analytics/`
pub async fn analytics<S: ExpenseStore>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Json(range): Json<DateRange>,
) -> Result<Json<BTreeMap<String, CategoryShare>>, LedgerError> {
    info!(
        request_id = %ctx.request_id,
        pipeline = ctx.pipeline,
        start = %range.start_date,
        end = %range.end_date,
        "Computing analytics"
    );
    let totals = state.store.category_totals(&ctx, range).await?;
    Ok(Json(category_breakdown(&totals)))
}
