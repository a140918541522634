//! `requests` is an async HTTP session client built on `reqwest`.
//!
//! A [`Session`] carries default options (params, headers, cookies, basic
//! auth, retry count), a cookie jar and transport settings (proxy, timeout,
//! keep-alive). Requests are described with [`RequestOptions`], merged with
//! the session defaults and executed with immediate retries:
//! - [`Session::do_request`]
//! - [`Session::get`], [`Session::post`], [`Session::put`], [`Session::delete`]
//! - [`Session::debug_trace`]
//!
//! The [`api`] module offers one-shot helpers, including [`api::wget`].

pub mod api;
mod body;
mod config;
mod error;
mod log;
mod options;
mod request;
mod response;
mod retry;
mod session;
mod transport;
mod value;

pub use body::{Body, ToJson};
pub use config::{ProxyConfig, SessionConfig};
pub use error::RequestsError;
#[cfg(feature = "tracing")]
pub use log::TracingSink;
pub use log::{LogSink, StderrSink};
pub use options::RequestOptions;
pub use request::{dump_request, dump_request_indent};
pub use response::Response;
pub use retry::{execute_with_retry, RetryOutcome};
pub use session::Session;
pub use tokio_util::sync::CancellationToken;
pub use transport::Transport;
pub use value::Value;

pub type Result<T> = std::result::Result<T, RequestsError>;
