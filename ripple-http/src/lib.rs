//! A REST client for Discord's API: rate-limit-aware request execution,
//! paired with `ripple-http-ratelimiting` for bucket tracking and
//! `ripple-model` for the [`Token`](ripple_model::Token) credential type.
//!
//! Request-body modeling for individual Discord routes is out of scope —
//! see [`client::Request`] for the thin, route-agnostic shape a caller
//! builds requests from.

#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_const_for_fn, clippy::pedantic, unsafe_code)]

pub mod api_error;
pub mod client;
pub mod error;

pub use self::{
    client::{Client, ClientBuilder, Request, Response},
    error::{Error, ErrorType},
};
