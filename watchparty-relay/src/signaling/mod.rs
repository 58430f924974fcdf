mod directory_handler;
mod ws_handler;

pub use directory_handler::*;
pub use ws_handler::*;
