mod directory;
mod registry;
mod room;

pub use registry::*;
pub use room::*;
