pub mod baseline;
pub mod config;
pub mod dcf;
pub mod demand;
pub mod error;
pub mod scenario;
pub mod sectors;
pub mod time_value;
pub mod types;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

pub use error::BuildoutError;
pub use types::*;

/// Standard result type for all build-out scenario operations
pub type BuildoutResult<T> = Result<T, BuildoutError>;
