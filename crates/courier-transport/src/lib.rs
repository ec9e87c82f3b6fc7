//! # courier-transport
//!
//! The HTTP capability the courier dispatcher is written against.
//!
//! - [`Transport`] / [`Session`]: single requests, multipart batch calls and
//!   per-call sessions
//! - [`ReqwestTransport`]: the real implementation over `reqwest`
//! - [`batch`]: the `multipart/mixed` codec used by batch calls
//! - [`TokenProvider`]: bearer tokens attached to every request
//! - [`mock::MockTransport`]: programmable transport for tests

#![deny(unsafe_code)]

pub mod batch;
pub mod credentials;
pub mod http;
pub mod mock;
pub mod traits;
pub mod types;

pub use credentials::{StaticToken, TokenProvider};
pub use http::{ReqwestSession, ReqwestTransport, ReqwestTransportConfig};
pub use traits::{Session, Transport};
pub use types::{HttpRequest, HttpResponse, Method, TransportError};
