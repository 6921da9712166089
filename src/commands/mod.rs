pub mod session_api;

pub use session_api::SessionHandle;
