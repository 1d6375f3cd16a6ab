//! WebSocket Probe Server
//!
//! A WebSocket endpoint for validating that connections survive a
//! CDN / reverse-proxy hop. Clients connect to `/ws?token=`, get echoed
//! frames and heartbeats back, and are subject to the admission and
//! lifecycle control plane below.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │               WS PROBE SERVER                │
//!                        │                                              │
//!   Handshake ───────────┼─▶ server/ws ──▶ admission ──▶ registry       │
//!                        │       │                          ▲           │
//!   Frames ◀─────────────┼── session ◀── rate_limit         │           │
//!                        │       ▲                          │           │
//!                        │       └── lifecycle/scheduler ───┘           │
//!                        │           (expiry, heartbeat, sweep,         │
//!                        │            auto-shutdown)                    │
//!                        │                                              │
//!   GET /health ─────────┼─▶ admin (read-only projections)              │
//!   GET /admin/* ────────┼─▶ admin (token gated)                        │
//!                        │                                              │
//!                        │  ┌────────────────────────────────────────┐  │
//!                        │  │        Cross-Cutting Concerns          │  │
//!                        │  │  config │ observability │ lifecycle    │  │
//!                        │  └────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod admission;
pub mod config;
pub mod registry;
pub mod server;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::ServerConfig;
pub use lifecycle::Shutdown;
pub use server::Server;
