mod begin;
mod handle;
mod manager;
mod peer_worker;
mod session_event;

pub use begin::*;
pub use handle::*;
pub use manager::*;
pub use session_event::*;
