//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Build subsystems → Arm recurring timers → Running
//!
//! Per connection (scheduler.rs):
//!     register → arm expiry → [timer fires → close + retire]
//!                           → [retire first → timer cancelled]
//!
//! Shutdown (shutdown.rs + state.rs):
//!     admin request / auto-shutdown / signal
//!         → Draining: cancel recurring timers, close connections
//!         → Stopped once the listener closes
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to every task
//! - Timers are cancelled before sockets are closed, so no callback runs
//!   against a draining registry
//! - Stopped is terminal

pub mod scheduler;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use scheduler::LifecycleScheduler;
pub use shutdown::{Shutdown, ShutdownReason};
pub use state::{ServerState, StateHandle};
