mod auth;
mod health_check;
mod session;

pub use auth::{login, register, DecoyCredential};
pub use health_check::health_check;
pub use session::{current_session, current_user};
