use jbpl_core::error::Error;
use jbpl_core::span::TokenRange;

/// Create an evaluation error without a source position
pub fn interpretation_error(message: impl Into<String>) -> Error {
    Error::evaluation(message, TokenRange::Undefined)
}

/// Create an evaluation error pointing at a source range
pub fn interpretation_error_at(message: impl Into<String>, range: TokenRange) -> Error {
    Error::evaluation(message, range)
}

// Convenience macros for generating interpretation errors

/// Macro to return early with an interpretation error
#[macro_export]
macro_rules! interp_bail {
    ($message:expr) => {
        return Err($crate::error::interpretation_error($message))
    };
    ($message:expr, $range:expr) => {
        return Err($crate::error::interpretation_error_at($message, $range))
    };
}

/// Macro to ensure a condition is true, or return an interpretation error
#[macro_export]
macro_rules! interp_ensure {
    ($cond:expr, $message:expr) => {
        if !($cond) {
            $crate::interp_bail!($message);
        }
    };
    ($cond:expr, $message:expr, $range:expr) => {
        if !($cond) {
            $crate::interp_bail!($message, $range);
        }
    };
}
