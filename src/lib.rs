//! Kurz - the resolution engine of a keyword-based URL shortener
//!
//! This library implements the decision procedure that maps long URLs to
//! short keywords and back: reuse an existing link, create one under a
//! caller-supplied keyword, or auto-generate one, with a precise error
//! taxonomy and explicit extension seams.
//!
//! # Architecture
//! - `codec`: reversible id ↔ keyword mapping over a configured alphabet
//! - `storage`: SeaORM-backed link and option stores with per-process caches
//! - `services`: the resolver state machine and its guards (flood, nonce),
//!   plus the title-fetch and GeoIP boundaries
//! - `hooks`: interception chain and notification event bus
//! - `config`: TOML + environment configuration
//! - `engine`: wires everything together, one instance per process

pub mod cache;
pub mod codec;
pub mod config;
pub mod engine;
pub mod errors;
pub mod hooks;
pub mod logging;
pub mod sanitize;
pub mod services;
pub mod storage;
pub mod structs;
pub mod utils;

pub use codec::KeywordCodec;
pub use config::AppConfig;
pub use engine::{Engine, EngineBuilder};
pub use errors::{KurzError, Result};
pub use structs::{Caller, ErrorCode, Fatal, LinkSummary, Resolution, ResolveRequest, Status};
