pub mod settings;
pub mod trade;
pub mod user;

pub use settings::*;
pub use trade::*;
pub use user::*;
