pub mod accounts;
pub mod credentials;
pub mod handlers;
pub mod identity;
pub mod session;

pub use credentials::PasswordHasher;
pub use identity::{SessionContext, SELF_SENTINEL};
pub use session::SessionStore;
