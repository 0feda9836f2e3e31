//! Gateway types module
//!
//! ## Submodules
//! - [`response`]: Response envelope, `ApiError` and error codes
//! - [`transfer`]: Transfer and transaction DTOs

pub mod response;
pub mod transfer;

pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};
pub use transfer::{HealthData, PageQuery, TransactionData, TransferRequestDto, TransferResponseData};
