//! # ripple
//!
//! `ripple` is the core of a client library for Discord's API. It is a
//! "skeleton crate": it re-exports the `ripple-*` crates that make up the
//! library so they can be depended on together, under one version, while
//! each remains independently usable.
//!
//! Two things form the hard engineering this core focuses on, and the rest
//! of this workspace exists to support them:
//!
//! - [`gateway`] — a stateless, duplex WebSocket transport for Discord's
//!   real-time event protocol: compression negotiation, payload decoding,
//!   and the demultiplexing/multiplexing [`gateway::Shard`] session.
//! - [`http`] and [`http_ratelimiting`] — a REST client that serializes
//!   outbound requests against Discord's server-side rate-limit buckets,
//!   whose identity is only discoverable from a response.
//!
//! [`model`] supplies the wire types ([`model::Snowflake`], [`model::Token`],
//! the gateway envelope and command payloads) shared by the two.
//!
//! Deliberately out of scope, left to the caller or a higher-level crate:
//! per-route request-body modeling, full event-payload typing, OAuth flows,
//! voice transport, caching, and sharding supervision. Each sub-crate's own
//! docs describe its slice in full; this crate only wires them together.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! ripple = "0.1"
//! ```
//!
//! Each re-export is behind a feature of the same name, all enabled by
//! default, so a caller that only needs the gateway (for example, to write
//! their own REST layer) can opt out of the rest:
//!
//! ```toml
//! [dependencies]
//! ripple = { version = "0.1", default-features = false, features = ["gateway", "model"] }
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use ripple::{
//!     gateway::Shard,
//!     http::Client,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let token = std::env::var("DISCORD_TOKEN")?;
//!
//! let http = Client::new(token.clone())?;
//! let shard = Shard::new(token);
//!
//! shard.connect("wss://gateway.discord.gg?v=6&encoding=json").await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

#[cfg(feature = "gateway")]
pub use ripple_gateway as gateway;

#[cfg(feature = "http")]
pub use ripple_http as http;

#[cfg(feature = "http-ratelimiting")]
pub use ripple_http_ratelimiting as http_ratelimiting;

#[cfg(feature = "model")]
pub use ripple_model as model;
