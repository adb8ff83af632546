//! Core types and traits for linear model training

pub mod error;
pub mod parameter;
pub mod problem;
pub mod traits;
pub mod types;

pub use self::error::*;
pub use self::parameter::*;
pub use self::problem::*;
pub use self::traits::*;
pub use self::types::*;
