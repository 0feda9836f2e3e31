//! Query handlers (transaction records)

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, PageQuery, TransactionData, ok};
use super::validation_error;
use crate::core_types::{AccountId, TransferId};
use crate::ledger::TransactionStatus;

/// Get one transaction by its transfer identifier
///
/// GET /api/v1/transactions/{transaction_id}
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<i64>,
) -> ApiResult<TransactionData> {
    match state
        .ledger
        .get_transaction(TransferId::new(transaction_id))
        .await
    {
        Ok(Some(record)) => ok(record.into()),
        Ok(None) => ApiError::not_found("Transaction not found").into_err(),
        Err(e) => {
            tracing::error!(transaction_id, error = %e, "Transaction lookup failed");
            ApiError::db_error("Query failed").into_err()
        }
    }
}

/// Transactions where the account is sender or receiver, newest first
///
/// GET /api/v1/accounts/{account_id}/transactions?skip=0&limit=100
pub async fn get_account_transactions(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<AccountId>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<TransactionData>> {
    page.validate().map_err(|e| validation_error(&e))?;

    match state
        .ledger
        .account_history(account_id, page.skip, page.limit)
        .await
    {
        Ok(records) => ok(records.into_iter().map(TransactionData::from).collect()),
        Err(e) => {
            tracing::error!(account_id, error = %e, "Account history query failed");
            ApiError::db_error("Query failed").into_err()
        }
    }
}

/// All transactions, newest first, optionally filtered by status
///
/// GET /api/v1/transactions?skip=0&limit=100&status=completed
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<TransactionData>> {
    page.validate().map_err(|e| validation_error(&e))?;

    let status = match page.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(
            s.parse::<TransactionStatus>()
                .map_err(ApiError::bad_request)?,
        ),
    };

    match state
        .ledger
        .list_transactions(status, page.skip, page.limit)
        .await
    {
        Ok(records) => ok(records.into_iter().map(TransactionData::from).collect()),
        Err(e) => {
            tracing::error!(error = %e, "Transaction list query failed");
            ApiError::db_error("Query failed").into_err()
        }
    }
}
