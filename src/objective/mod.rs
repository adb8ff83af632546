//! Smooth primal objectives for the Newton optimizer

pub mod l2_svc;
pub mod l2_svr;
pub mod logistic;
pub mod matvec;
pub mod traits;

pub use self::l2_svc::*;
pub use self::l2_svr::*;
pub use self::logistic::*;
pub use self::traits::*;
