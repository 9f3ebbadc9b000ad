//! Notification catalog entries and per-notification options.

use uuid::Uuid;

use crate::resource::Resource;

/// Lowest priority accepted on the wire.
pub const MIN_PRIORITY: i8 = -2;
/// Highest priority accepted on the wire.
pub const MAX_PRIORITY: i8 = 2;

/// One notification kind registered by the application.
#[derive(Debug, Clone)]
pub struct NotificationType {
    /// Stable protocol key, unique within a registration.
    pub name: String,
    pub display_name: Option<String>,
    pub enabled: bool,
    pub icon: Option<Resource>,
}

impl NotificationType {
    /// Enabled type with no display name and no icon.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            enabled: true,
            icon: None,
        }
    }
}

/// Options for a single NOTIFY.
#[derive(Debug, Clone, Default)]
pub struct NotifyOptions {
    pub sticky: bool,
    priority: i8,
    pub icon: Option<Resource>,
    /// Echoed back in callbacks.
    pub callback_context: String,
    /// URL the daemon opens on click.
    pub callback_target: Option<String>,
}

impl NotifyOptions {
    pub fn with_sticky(mut self, sticky: bool) -> Self {
        self.sticky = sticky;
        self
    }

    pub fn with_icon(mut self, icon: Option<Resource>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_callback_context(mut self, context: impl Into<String>) -> Self {
        self.callback_context = context.into();
        self
    }

    pub fn with_callback_target(mut self, target: impl Into<String>) -> Self {
        self.callback_target = Some(target.into());
        self
    }

    /// Set priority, clamped to [-2, 2].
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.set_priority(priority);
        self
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = clamp_priority(priority);
    }

    pub fn priority(&self) -> i8 {
        self.priority
    }
}

pub fn clamp_priority(priority: i32) -> i8 {
    priority.clamp(MIN_PRIORITY as i32, MAX_PRIORITY as i32) as i8
}

/// Fresh notification identifier, echoed back by the daemon in callbacks.
pub fn new_notification_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Flat one-shot notification, registered on first use.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Notification type name.
    pub event: String,
    pub title: String,
    pub text: String,
    /// Icon file path.
    pub icon: Option<String>,
    /// Callback target URL.
    pub callback: Option<String>,
    pub display_name: Option<String>,
    pub sticky: bool,
    pub priority: i32,
}

impl Message {
    /// Catalog entry for `event`; display name defaults to the event name.
    pub fn notification_type(&self, icon: Option<Resource>) -> NotificationType {
        NotificationType {
            name: self.event.clone(),
            display_name: Some(
                self.display_name
                    .clone()
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| self.event.clone()),
            ),
            enabled: true,
            icon,
        }
    }

    pub fn notify_options(&self, icon: Option<Resource>) -> NotifyOptions {
        let options = NotifyOptions::default()
            .with_sticky(self.sticky)
            .with_icon(icon)
            .with_priority(self.priority);
        match self.callback.as_deref().filter(|c| !c.is_empty()) {
            Some(target) => options.with_callback_target(target),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_clamped() {
        assert_eq!(NotifyOptions::default().with_priority(5).priority(), 2);
        assert_eq!(NotifyOptions::default().with_priority(-5).priority(), -2);
        for p in -2..=2 {
            assert_eq!(NotifyOptions::default().with_priority(p).priority() as i32, p);
        }
        assert_eq!(clamp_priority(i32::MAX), 2);
        assert_eq!(clamp_priority(i32::MIN), -2);
    }

    #[test]
    fn setters_fill_every_option() {
        let icon = Resource::from_bytes(vec![1u8, 2, 3], "image/png");
        let opts = NotifyOptions::default()
            .with_sticky(true)
            .with_icon(Some(icon.clone()))
            .with_callback_context("ctx")
            .with_callback_target("https://example.com")
            .with_priority(-1);
        assert!(opts.sticky);
        assert_eq!(opts.priority(), -1);
        assert_eq!(opts.icon.map(|r| r.id()), Some(icon.id()));
        assert_eq!(opts.callback_context, "ctx");
        assert_eq!(opts.callback_target.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn notification_ids_are_unique() {
        let a = new_notification_id();
        let b = new_notification_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn message_display_name_defaults_to_event() {
        let msg = Message {
            event: "alert".into(),
            ..Message::default()
        };
        let nt = msg.notification_type(None);
        assert_eq!(nt.name, "alert");
        assert_eq!(nt.display_name.as_deref(), Some("alert"));
        assert!(nt.enabled);
    }

    #[test]
    fn message_options_clamp_and_drop_empty_callback() {
        let msg = Message {
            event: "alert".into(),
            callback: Some(String::new()),
            sticky: true,
            priority: 9,
            ..Message::default()
        };
        let opts = msg.notify_options(None);
        assert!(opts.sticky);
        assert_eq!(opts.priority(), 2);
        assert!(opts.callback_target.is_none());
    }
}
