//! GNTP (Growl Notification Transport Protocol) client core.
//! No network I/O: builds request packets, validates responses, parses callbacks.

pub mod callback;
pub mod icon;
pub mod notification;
pub mod packet;
pub mod resource;
pub mod response;

pub use callback::{acknowledgement, CallbackInfo, CallbackKind, CallbackParseError};
pub use icon::IconMode;
pub use notification::{new_notification_id, Message, NotificationType, NotifyOptions};
pub use packet::{encode_notify, encode_register, Application, Notification, Packet};
pub use resource::{Resource, ResourceError, ResourceId};
pub use response::{validate_response, ResponseError};

/// Protocol version in the request line.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Standard daemon port.
pub const DEFAULT_PORT: u16 = 23053;

/// Line terminator for every protocol line.
pub const CRLF: &str = "\r\n";
