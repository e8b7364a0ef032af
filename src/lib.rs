//! `httpretry` issues HTTP requests against one endpoint and retries them on
//! transport failure or while a caller-supplied predicate asks for it.
//!
//! The entry point is [`RetryableRequest`]:
//! - [`RetryableRequest::get`] / [`RetryableRequest::delete`]
//! - [`RetryableRequest::post`] / [`RetryableRequest::put`] /
//!   [`RetryableRequest::patch`]
//!
//! Retries use a fixed wait and a bounded attempt count. A delivered
//! response is never an error; check [`Response::status`] to confirm
//! semantic success.

mod client;
mod diagnostics;
mod error;
mod headers;
mod options;
mod response;
pub mod transport;

pub use client::{RetryPredicate, RetryableRequest};
pub use error::Error;
pub use headers::{DEFAULT_ACCEPT, DEFAULT_CONTENT_TYPE};
pub use options::{RetryOptions, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT_MS};
pub use response::{status_mismatch, Response};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, Error>;
