pub mod listener;
pub mod origin;

pub use listener::{Server, ServerHandle, ServerOptions};
pub use origin::{GREETING, Origin};
