//! Result type alias for catex

use super::errors::CatexError;

/// Result type alias for catex operations
///
/// # Examples
///
/// ```
/// use catex::domain::result::Result;
/// use catex::domain::errors::CatexError;
///
/// fn failing_function() -> Result<()> {
///     Err(CatexError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CatexError>;
