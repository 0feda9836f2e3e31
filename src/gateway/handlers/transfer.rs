//! Transfer handler

use std::sync::Arc;

use axum::{Json, extract::State};
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, TransferRequestDto, TransferResponseData, created};
use super::validation_error;

/// Execute an account-to-account transfer
///
/// POST /api/v1/transfer
///
/// - 201: committed (the event may still be pending in the outbox)
/// - 400: request shape or business validation failed, including an unknown
///   or inactive account
/// - 500: ledger failure or an account without an owner row; nothing moved
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferRequestDto>,
) -> ApiResult<TransferResponseData> {
    req.validate().map_err(|e| validation_error(&e))?;

    tracing::info!(
        from = req.from_account_id,
        to = req.to_account_id,
        amount = %req.amount,
        "Transfer request"
    );

    let receipt = state
        .executor
        .execute(req.into())
        .await
        .map_err(ApiError::from)?;

    created(receipt.into())
}
