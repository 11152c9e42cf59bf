pub mod extract;
pub mod password;
pub mod session;
pub mod users;

pub use extract::AuthUser;
pub use session::{authenticate, login, logout};
pub use users::register;
