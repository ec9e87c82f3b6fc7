//! # courier-core
//!
//! Shared vocabulary for the courier push notification client.
//!
//! - **Message model**: typed [`Message`], [`MulticastMessage`] and the
//!   Android, Webpush and APNs blocks, serialized with idiomatic camelCase names
//! - **Validation**: [`validate::validate_message`] turns the JSON form of a
//!   message into the backend's wire form, failing with the dotted field path
//! - **Key mapping**: [`key_map::rename_keys`] driven by static per-level tables
//! - **Errors**: [`MessagingError`] with a closed [`ErrorKind`] taxonomy and
//!   backend code translation tables
//! - **Responses**: [`SendResponse`], [`BatchResponse`], topic management and
//!   legacy send outcomes
//! - **Logging**: [`logging::init_subscriber`]

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod key_map;
pub mod logging;
pub mod message;
pub mod responses;
pub mod validate;

pub use errors::{ErrorKind, MessagingError, Result};
pub use message::{
    AndroidConfig, AndroidNotification, ApnsConfig, Message, MulticastMessage, Notification,
    WebpushConfig,
};
pub use responses::{
    BatchResponse, MessagingConditionResponse, MessagingDeviceGroupResponse,
    MessagingDeviceResult, MessagingDevicesResponse, MessagingTopicResponse, SendResponse,
    TopicManagementError, TopicManagementResponse,
};
