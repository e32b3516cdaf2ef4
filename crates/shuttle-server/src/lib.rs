//! # shuttle-server
//!
//! Live location channel of the school shuttle backend.
//!
//! Each user opens one WebSocket at `/ws/{id}` and streams location pings;
//! a newer connection for the same user closes the older one. Presence
//! (online/offline) is written through on connect and disconnect.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod session;

pub use config::Config;
pub use handlers::{build_router, run_server, AppState};
pub use session::{run_session, Session, SessionContext, SessionEnd, SessionState};
