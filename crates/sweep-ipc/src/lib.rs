mod bridge;
mod error;
mod process;
mod session;

pub use bridge::{BridgeConfig, BridgeManager, CommandReply};
pub use error::IpcError;
pub use session::{BridgeProvider, BridgeSession};
