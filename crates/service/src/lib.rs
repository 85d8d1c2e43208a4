//! `guardian-service`: the session lifecycle manager and its wiring.

pub mod config;
pub mod manager;
pub mod refresh;
pub mod runtime;

pub use config::{ConfigError, GuardianConfig};
pub use manager::{LoginRequest, SessionManager, SessionState};
pub use refresh::{RefreshWorker, RefreshWorkerHandle};
pub use runtime::{GuardianRuntime, bootstrap};
