pub mod login;
pub mod session_actor;

pub use login::{LoginOutcome, attempt_login};
pub use session_actor::{SessionHandle, spawn};
