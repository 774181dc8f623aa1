//! Result type alias for fieldsync
//!
//! This module provides a convenient Result type alias that uses
//! [`FieldSyncError`] as the error type.

use super::errors::FieldSyncError;

/// Result type alias for fieldsync operations
///
/// # Examples
///
/// ```
/// use fieldsync::domain::result::Result;
/// use fieldsync::domain::errors::FieldSyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(FieldSyncError::Store("disk full".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, FieldSyncError>;
