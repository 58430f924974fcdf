mod config;
mod directory;
mod error;
mod media;
mod session;
mod signaling;
mod transport;

pub use config::*;
pub use directory::*;
pub use error::*;
pub use media::*;
pub use session::*;
pub use signaling::*;
pub use transport::*;
