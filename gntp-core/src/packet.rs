//! REGISTER and NOTIFY encoding: header block text plus the resources that
//! follow it as raw blocks (binary icon mode only).

use std::collections::HashSet;
use std::fmt::Display;

use crate::icon::{self, IconMode};
use crate::notification::{NotificationType, NotifyOptions};
use crate::resource::{Resource, ResourceId};
use crate::{CRLF, PROTOCOL_VERSION};

/// Callback context type sent with every NOTIFY while a listener is active.
pub const CALLBACK_CONTEXT_TYPE: &str = "string";

/// Sending application, as seen by the encoder.
#[derive(Debug, Clone, Copy)]
pub struct Application<'a> {
    pub name: &'a str,
    pub icon: Option<&'a Resource>,
    pub icon_mode: IconMode,
    /// Externally reachable callback URL; `Some` while a listener is running.
    pub callback_url: Option<&'a str>,
}

/// Title, body and identity of one NOTIFY.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    /// Registered notification type name.
    pub name: &'a str,
    pub id: &'a str,
    pub title: &'a str,
    pub text: &'a str,
}

/// Encoded request. `header` ends with a blank line; `resources` are written
/// after it in order, each followed by CRLF.
#[derive(Debug, Clone)]
pub struct Packet {
    header: String,
    resources: Vec<Resource>,
}

impl Packet {
    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Header lines starting with `key: `, values only.
    pub fn header_values<'s>(&'s self, key: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.header.split(CRLF).filter_map(move |line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix(": "))
        })
    }
}

struct PacketBuilder {
    mode: IconMode,
    header: String,
    resources: Vec<Resource>,
    seen: HashSet<ResourceId>,
}

impl PacketBuilder {
    fn new(request: &str, mode: IconMode) -> Self {
        let mut b = Self {
            mode,
            header: String::with_capacity(512),
            resources: Vec::new(),
            seen: HashSet::new(),
        };
        b.raw_line(&format!("GNTP/{} {} NONE", PROTOCOL_VERSION, request));
        b
    }

    fn raw_line(&mut self, line: &str) {
        self.header.push_str(line);
        self.header.push_str(CRLF);
    }

    fn line(&mut self, key: &str, value: impl Display) {
        self.raw_line(&format!("{}: {}", key, value));
    }

    fn blank(&mut self) {
        self.header.push_str(CRLF);
    }

    /// Emit an icon header; in binary mode schedule the resource once per packet.
    fn icon(&mut self, key: &str, resource: &Resource) {
        self.line(key, icon::reference(resource, self.mode));
        if self.mode.sends_binary() && self.seen.insert(resource.id()) {
            self.resources.push(resource.clone());
        }
    }

    fn finish(mut self) -> Packet {
        if self.mode.sends_binary() {
            let decls: Vec<(ResourceId, usize)> =
                self.resources.iter().map(|r| (r.id(), r.len())).collect();
            for (id, len) in decls {
                self.line("Identifier", id);
                self.line("Length", len);
                self.blank();
            }
        }
        Packet {
            header: self.header,
            resources: self.resources,
        }
    }
}

fn bool_value(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Build a REGISTER packet announcing `types` in the given order.
pub fn encode_register(app: &Application<'_>, types: &[NotificationType]) -> Packet {
    let mut b = PacketBuilder::new("REGISTER", app.icon_mode);
    b.line("Application-Name", app.name);
    if let Some(icon) = app.icon {
        b.icon("Application-Icon", icon);
    }
    if let Some(url) = app.callback_url {
        b.line("Notification-Callback-Target", url);
    }
    b.line("Notifications-Count", types.len());
    b.blank();

    for nt in types {
        b.line("Notification-Name", &nt.name);
        if let Some(display) = nt.display_name.as_deref().filter(|d| !d.is_empty()) {
            b.line("Notification-Display-Name", display);
        }
        b.line("Notification-Enabled", bool_value(nt.enabled));
        if let Some(icon) = &nt.icon {
            b.icon("Notification-Icon", icon);
        }
        b.blank();
    }
    b.finish()
}

/// Build a NOTIFY packet. Sticky is only sent when set and priority only when nonzero.
pub fn encode_notify(
    app: &Application<'_>,
    notification: &Notification<'_>,
    options: &NotifyOptions,
) -> Packet {
    let mut b = PacketBuilder::new("NOTIFY", app.icon_mode);
    b.line("Application-Name", app.name);
    b.line("Notification-Name", notification.name);
    b.line("Notification-ID", notification.id);
    b.line("Notification-Title", notification.title);
    b.line("Notification-Text", notification.text);
    if options.sticky {
        b.line("Notification-Sticky", bool_value(true));
    }
    if options.priority() != 0 {
        b.line("Notification-Priority", options.priority());
    }
    if let Some(icon) = &options.icon {
        b.icon("Notification-Icon", icon);
    }
    if app.callback_url.is_some() {
        b.line("Notification-Callback-Context", &options.callback_context);
        b.line("Notification-Callback-Context-Type", CALLBACK_CONTEXT_TYPE);
        if let Some(target) = &options.callback_target {
            b.line("Notification-Callback-Target", target);
        }
    }
    b.blank();
    b.finish()
}
