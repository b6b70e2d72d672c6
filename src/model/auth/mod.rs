mod session;

pub use session::{SessionError, SessionUser, SESSION_COOKIE};
