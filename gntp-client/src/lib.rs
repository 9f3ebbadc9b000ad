//! GNTP client over TCP: register an application, send notifications and
//! receive click/close/timeout callbacks. Encoding lives in `gntp-core`.

pub mod client;
pub mod config;
pub mod error;
pub mod listener;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Phase};
pub use listener::{local_ipv4, AddressResolver, CallbackHandler, CallbackListener};

pub use gntp_core::{
    CallbackInfo, CallbackKind, IconMode, Message, NotificationType, NotifyOptions, Resource,
};
