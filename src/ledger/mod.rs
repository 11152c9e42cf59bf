pub mod equity;
pub mod pnl;
pub mod repository;

pub use pnl::{compute_pnl, numeric_result, Outcome};
pub use repository::*;
