//! `hrana-http` is an async client for remote SQL endpoints speaking a
//! Hrana-style JSON-over-HTTP pipeline protocol.
//!
//! The crate wraps the `/v2/pipeline` endpoint with typed operations:
//! - [`HranaClient::execute`]
//! - [`HranaClient::execute_sequence`]
//! - [`HranaClient::execute_batch`]
//! - [`HranaClient::execute_transactional_batch`]
//!
//! Every operation is one self-contained HTTP round trip, cancellable
//! through a [`tokio_util::sync::CancellationToken`]. Failures surface as
//! the typed [`HranaError`] taxonomy; nothing is retried internally.

mod batch;
mod client;
mod codec;
mod error;
mod params;
mod translate;
mod transport;
mod types;
mod value;
mod wire;

pub use batch::{BatchStep, StepCondition};
pub use client::HranaClient;
pub use error::HranaError;
pub use params::{Params, Statement};
pub use types::{Col, ResultSet, StepOutcome};
pub use value::Value;

pub type Result<T> = std::result::Result<T, HranaError>;
