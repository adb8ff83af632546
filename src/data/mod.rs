//! Data loading and layout conversion
//!
//! [`libsvm`] reads LibSVM text files into a [`crate::core::Problem`];
//! [`transpose`] builds the column-major view used by the L1 solvers.

pub mod libsvm;
pub mod transpose;

pub use self::libsvm::*;
pub use self::transpose::*;
