mod dialog;
mod error;
mod events;
mod protocol;
mod proxy;
mod session;

pub use dialog::*;
pub use error::*;
pub use events::*;
pub use protocol::*;
pub use proxy::*;
pub use session::*;
