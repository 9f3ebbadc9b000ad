//! Inbound callback messages: daemon reports click/close/timeout for a
//! notification sent earlier.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::{CRLF, PROTOCOL_VERSION};

/// Reply written to the daemon after a callback is parsed.
pub fn acknowledgement() -> String {
    format!("GNTP/{} -OK NONE{}{}", PROTOCOL_VERSION, CRLF, CRLF)
}

const RESULT_KEY: &str = "Notification-Callback-Result: ";
const ID_KEY: &str = "Notification-ID: ";
const CONTEXT_KEY: &str = "Notification-Callback-Context: ";
const CONTEXT_TYPE_KEY: &str = "Notification-Callback-Context-Type: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    Click,
    Close,
    Timeout,
}

impl CallbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackKind::Click => "CLICK",
            CallbackKind::Close => "CLOSE",
            CallbackKind::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallbackKind {
    type Err = CallbackParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CLICK" | "CLICKED" => Ok(CallbackKind::Click),
            "CLOSE" | "CLOSED" => Ok(CallbackKind::Close),
            "TIMEOUT" | "TIMEDOUT" => Ok(CallbackKind::Timeout),
            other => Err(CallbackParseError::UnknownResult(other.to_string())),
        }
    }
}

/// One received callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackInfo {
    pub kind: CallbackKind,
    pub notification_id: String,
    pub context: String,
    pub context_type: String,
    pub received_at: DateTime<Utc>,
}

impl CallbackInfo {
    /// Parse a callback message. Only the four callback headers are read;
    /// other lines are ignored.
    pub fn parse(message: &str, received_at: DateTime<Utc>) -> Result<Self, CallbackParseError> {
        let mut kind = None;
        let mut notification_id = String::new();
        let mut context = String::new();
        let mut context_type = String::new();
        for line in message.split(CRLF) {
            if let Some(v) = line.strip_prefix(RESULT_KEY) {
                kind = Some(v.parse::<CallbackKind>()?);
            } else if let Some(v) = line.strip_prefix(ID_KEY) {
                notification_id = v.to_string();
            } else if let Some(v) = line.strip_prefix(CONTEXT_TYPE_KEY) {
                context_type = v.to_string();
            } else if let Some(v) = line.strip_prefix(CONTEXT_KEY) {
                context = v.to_string();
            }
        }
        Ok(Self {
            kind: kind.ok_or(CallbackParseError::MissingResult)?,
            notification_id,
            context,
            context_type,
            received_at,
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CallbackParseError {
    #[error("missing Notification-Callback-Result")]
    MissingResult,
    #[error("unknown callback result: {0}")]
    UnknownResult(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_click() {
        let now = Utc::now();
        let info = CallbackInfo::parse(
            "Notification-Callback-Result: CLICK\r\nNotification-ID: abc\r\n\r\n",
            now,
        )
        .unwrap();
        assert_eq!(info.kind, CallbackKind::Click);
        assert_eq!(info.notification_id, "abc");
        assert_eq!(info.context, "");
        assert_eq!(info.received_at, now);
    }

    #[test]
    fn parse_full_message_ignores_unknown_lines() {
        let msg = "GNTP/1.0 -CALLBACK NONE\r\n\
            Application-Name: App\r\n\
            Notification-ID: n1\r\n\
            Notification-Callback-Result: TIMEOUT\r\n\
            Notification-Callback-Context: user_data_123\r\n\
            Notification-Callback-Context-Type: string\r\n\
            X-Custom: whatever\r\n\r\n";
        let info = CallbackInfo::parse(msg, Utc::now()).unwrap();
        assert_eq!(info.kind, CallbackKind::Timeout);
        assert_eq!(info.notification_id, "n1");
        assert_eq!(info.context, "user_data_123");
        assert_eq!(info.context_type, "string");
    }

    #[test]
    fn missing_result_is_malformed() {
        assert_eq!(
            CallbackInfo::parse("Notification-ID: abc\r\n\r\n", Utc::now()),
            Err(CallbackParseError::MissingResult)
        );
    }

    #[test]
    fn unknown_result_is_malformed() {
        assert_eq!(
            CallbackInfo::parse("Notification-Callback-Result: EXPLODE\r\n", Utc::now()),
            Err(CallbackParseError::UnknownResult("EXPLODE".into()))
        );
    }

    #[test]
    fn kind_display_roundtrip() {
        for kind in [CallbackKind::Click, CallbackKind::Close, CallbackKind::Timeout] {
            assert_eq!(kind.to_string().parse::<CallbackKind>(), Ok(kind));
        }
        assert_eq!("CLOSED".parse::<CallbackKind>(), Ok(CallbackKind::Close));
    }

    #[test]
    fn acknowledgement_is_one_status_line() {
        assert_eq!(acknowledgement(), "GNTP/1.0 -OK NONE\r\n\r\n");
    }
}
