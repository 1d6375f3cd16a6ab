//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound message:
//!     → rate_limit.rs (per-source fixed window)
//!     → Pass to session handling
//! ```
//!
//! # Design Decisions
//! - Rate limiting is per source address, not per connection, so parallel
//!   connections from one source share an allowance
//! - Over-limit messages are rejected but still counted

pub mod rate_limit;

pub use rate_limit::RateLimiter;
