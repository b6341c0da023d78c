pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod translate;

pub use backend::{ConverseBackend, ConverseEventStream, HttpConverseClient};
pub use clock::Clock;
pub use config::{ModelAliases, SidecarConfig};
pub use error::{Result, SidecarError};
pub use server::{build_router, AppState};
