//! The Discord Gateway transport core: a single [`Shard`] connection, its
//! zlib [`compression`] and JSON [`json`] decoding strategies, the
//! identify-rate-limit [`queue`], and the [`event`] stream a caller drives a
//! session loop from.
//!
//! This crate speaks the wire protocol and nothing else: it has no opinion
//! on sharding topology, event caching, or command dispatch. Pair it with
//! `ripple-model` for the payload types and `ripple-http` for the REST side.

#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_const_for_fn, clippy::pedantic, unsafe_code)]

pub mod compression;
pub mod event;
pub mod json;
pub mod queue;
pub mod shard;

pub use self::{
    event::Event,
    shard::{Shard, ShardBuilder},
};

/// Discord Gateway API version this core targets. `Shard::connect` only
/// warns, rather than failing, when a connection URI names a different
/// version — see [`shard::Shard::connect`].
pub const API_VERSION: u8 = 6;
