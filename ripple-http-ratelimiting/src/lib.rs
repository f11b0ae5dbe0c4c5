//! Discord REST API rate-limit bucket tracking.
//!
//! This crate owns no HTTP transport of its own: a caller resolves a
//! [`LimitKey`] for the route it's about to call, waits out any cooldown on
//! the returned [`Bucket`], issues the request itself, then feeds the
//! response headers back through [`Ratelimiter::update`]. `ripple-http`
//! wires this into an actual request cycle.

#![deny(clippy::missing_const_for_fn, clippy::pedantic, unsafe_code)]

mod bucket;
mod error;
mod headers;
mod key;
mod limiter;

pub use self::{
    bucket::Bucket,
    error::{BucketError, BucketErrorType, UpdateError, UpdateErrorType},
    headers::{parse_raw, RawHeaders},
    key::{LimitKey, MajorParameter},
    limiter::Ratelimiter,
};
