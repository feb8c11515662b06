//! fedi-lookup - resolve Fediverse handles, URLs and domains
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Input classification                                     │
//! │  - Canonical-id / Announce orchestration                    │
//! │  - Cross-instance URL guessing                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Federation Layer                          │
//! │  - WebFinger and NodeInfo discovery                         │
//! │  - HTTP Signatures (ephemeral RSA key)                      │
//! │  - Object fetching over a pluggable transport               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Discovery documents                                      │
//! │  - Untyped ActivityPub objects with path access             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `service`: Classification and resolution orchestration
//! - `federation`: Discovery protocols, signing and fetching
//! - `data`: Documents and field access
//! - `render`: Plain-text output
//! - `config`: Configuration management
//! - `error`: Error types

pub mod config;
pub mod data;
pub mod error;
pub mod federation;
pub mod render;
pub mod service;

pub use config::AppConfig;
pub use data::Resolution;
pub use error::ResolveError;
pub use service::Resolver;
