//! Wire types shared between the Ripple gateway and REST crates.
//!
//! This crate has no knowledge of sockets or HTTP; it only models the bytes
//! that cross the wire in either direction: [`Snowflake`] identifiers,
//! [`Token`] credentials, and the gateway's [`gateway::Packet`] envelope and
//! outgoing command payloads.

#![deny(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod gateway;
pub mod snowflake;
pub mod token;

pub use self::{snowflake::Snowflake, token::Token};
