pub mod error;
pub mod passwords;
pub mod service;
pub mod session;
pub mod validation;

pub use error::AuthError;
pub use service::{bootstrap_admin, provision_user, set_user_password, AuthGate, NewAccount};
pub use session::{Claims, Session, SessionStore};
