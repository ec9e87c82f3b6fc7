//! # courier-messaging
//!
//! The push notification dispatcher.
//!
//! [`Messaging`] validates messages, resolves the project endpoint once, and
//! delivers through a [`courier_transport::Transport`]:
//!
//! - [`Messaging::send`]: one message, one request
//! - [`Messaging::send_each`] / [`Messaging::send_each_for_multicast`]:
//!   concurrent fan-out, one request per message, partial failures reported
//! - [`Messaging::send_all`] / [`Messaging::send_multicast`]: one multipart
//!   batch call
//! - [`Messaging::subscribe_to_topic`] / [`Messaging::unsubscribe_from_topic`]
//! - Legacy `/fcm/send` API: [`Messaging::send_to_device`] and friends

#![deny(unsafe_code)]

pub mod error_mapping;
pub mod legacy;
pub mod messaging;
pub mod project;
pub mod request_handler;
pub mod topic;

pub use messaging::{MULTICAST_COPIED_FIELDS, Messaging, MessagingConfig, expand_multicast};
pub use project::{EnvProjectId, ProjectIdChain, ProjectIdResolver, StaticProjectId};
pub use request_handler::RequestHandler;
