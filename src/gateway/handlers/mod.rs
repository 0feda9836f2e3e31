//! HTTP handlers
//!
//! - [`transfer`]: POST /api/v1/transfer
//! - [`query`]: transaction lookups and listings
//! - [`health`]: GET /api/v1/health

pub mod health;
pub mod query;
pub mod transfer;

pub use health::health_check;
pub use query::{get_account_transactions, get_transaction, list_transactions};
pub use transfer::create_transfer;

use validator::ValidationErrors;

use super::types::ApiError;

/// Flatten validator output into one 400 message, fields in name order
pub(crate) fn validation_error(errors: &ValidationErrors) -> ApiError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let msg = fields
        .iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .or_else(|| errs.first().map(|e| e.code.to_string()))
                .unwrap_or_else(|| "invalid".to_string());
            format!("{}: {}", field, reason)
        })
        .collect::<Vec<_>>()
        .join("; ");

    ApiError::bad_request(msg)
}
