//! The external API surface consumed by the coordination engine.
//!
//! [`DispatchApi`] is the abstract contract; [`HttpDispatchApi`] talks to
//! the real backend with bearer-token auth; [`MockDispatchApi`] scripts
//! responses for engine tests.

pub mod client;
pub mod mock;

pub use client::{DispatchApi, HttpDispatchApi};
pub use mock::MockDispatchApi;
