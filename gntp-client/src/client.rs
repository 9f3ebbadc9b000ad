//! Session with one daemon: REGISTER once, then any number of NOTIFYs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gntp_core::{
    encode_notify, encode_register, new_notification_id, Application, CallbackInfo, Message,
    Notification, NotificationType, NotifyOptions, Packet, Resource,
};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::listener::{default_resolver, AddressResolver, CallbackHandler, CallbackListener};
use crate::transport;

/// GNTP client. Every request opens its own connection; calls may run
/// concurrently from several tasks and are not ordered relative to each other.
pub struct Client {
    config: ClientConfig,
    app_icon: Option<Resource>,
    registered: AtomicBool,
    listener: Option<CallbackListener>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            app_icon: None,
            registered: AtomicBool::new(false),
            listener: None,
        }
    }

    /// Application icon sent with REGISTER.
    pub fn with_app_icon(mut self, icon: Resource) -> Self {
        self.app_icon = Some(icon);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Callback URL announced to the daemon, if a listener is running.
    pub fn callback_url(&self) -> Option<&str> {
        self.listener.as_ref().map(|l| l.url())
    }

    /// Start the callback listener. Call before `register` so the daemon
    /// learns the callback URL.
    pub async fn listen_for_callbacks<F>(&mut self, handler: F) -> Result<(), ClientError>
    where
        F: Fn(CallbackInfo) + Send + Sync + 'static,
    {
        self.listen_for_callbacks_with(Arc::new(handler), &default_resolver())
            .await
    }

    /// Same as `listen_for_callbacks` with an explicit address resolver.
    pub async fn listen_for_callbacks_with(
        &mut self,
        handler: CallbackHandler,
        resolver: &AddressResolver,
    ) -> Result<(), ClientError> {
        if self.listener.is_some() {
            return Ok(());
        }
        let listener = CallbackListener::bind(handler, resolver)
            .await
            .map_err(ClientError::Listener)?;
        self.listener = Some(listener);
        Ok(())
    }

    fn application(&self) -> Application<'_> {
        Application {
            name: &self.config.application_name,
            icon: self.app_icon.as_ref(),
            icon_mode: self.config.icon_mode,
            callback_url: self.callback_url(),
        }
    }

    pub fn encode_register(&self, types: &[NotificationType]) -> Packet {
        encode_register(&self.application(), types)
    }

    /// Encode a NOTIFY with a fresh notification id. Fails if not registered.
    pub fn encode_notify(
        &self,
        name: &str,
        title: &str,
        text: &str,
        options: &NotifyOptions,
    ) -> Result<Packet, ClientError> {
        if !self.is_registered() {
            return Err(ClientError::NotRegistered);
        }
        let id = new_notification_id();
        let notification = Notification {
            name,
            id: &id,
            title,
            text,
        };
        Ok(encode_notify(&self.application(), &notification, options))
    }

    /// Register the application and its notification catalog.
    pub async fn register(&self, types: &[NotificationType]) -> Result<String, ClientError> {
        let packet = self.encode_register(types);
        self.log_packet("REGISTER", &packet);
        let response = self.send(&packet).await?;
        self.registered.store(true, Ordering::Release);
        log::debug!(
            "registered {} with {} notification type(s)",
            self.config.application_name,
            types.len()
        );
        Ok(response)
    }

    pub async fn notify(&self, name: &str, title: &str, text: &str) -> Result<String, ClientError> {
        self.notify_with_options(name, title, text, &NotifyOptions::default())
            .await
    }

    pub async fn notify_with_options(
        &self,
        name: &str,
        title: &str,
        text: &str,
        options: &NotifyOptions,
    ) -> Result<String, ClientError> {
        let packet = self.encode_notify(name, title, text, options)?;
        self.log_packet("NOTIFY", &packet);
        self.send(&packet).await
    }

    /// One-shot send: loads the icon, registers `msg.event` on first use, notifies.
    pub async fn send_message(&self, msg: &Message) -> Result<String, ClientError> {
        let icon = match msg.icon.as_deref().filter(|p| !p.is_empty()) {
            Some(path) => Some(Resource::load(path)?),
            None => None,
        };
        if !self.is_registered() {
            self.register(&[msg.notification_type(icon.clone())]).await?;
        }
        self.notify_with_options(&msg.event, &msg.title, &msg.text, &msg.notify_options(icon))
            .await
    }

    /// Shut the callback listener down, waiting for in-flight handlers.
    pub async fn close(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.shutdown().await;
        }
    }

    async fn send(&self, packet: &Packet) -> Result<String, ClientError> {
        transport::send_packet(
            &self.config.address(),
            self.config.timeout(),
            packet,
            self.config.debug,
        )
        .await
    }

    fn log_packet(&self, kind: &str, packet: &Packet) {
        if self.config.debug {
            log::debug!(
                "{} packet (mode {:?}, {} resource(s)):\n{}",
                kind,
                self.config.icon_mode,
                packet.resources().len(),
                packet.header()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gntp_core::{CallbackKind, IconMode};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    const OK: &str = "GNTP/1.0 -OK NONE\r\n\r\n";

    /// Daemon that answers every connection with `reply` and forwards each header block.
    async fn fake_daemon(reply: &'static str) -> (u16, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    // header blocks end with a blank line
                    while !buf.ends_with(b"\r\n\r\n") {
                        let n = stream.read(&mut chunk).await.unwrap();
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                    }
                    stream.write_all(reply.as_bytes()).await.unwrap();
                    let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
                });
            }
        });
        (port, rx)
    }

    fn config(port: u16) -> ClientConfig {
        ClientConfig {
            host: "127.0.0.1".into(),
            port,
            timeout_secs: 5,
            ..ClientConfig::new("Test App")
        }
    }

    fn alert() -> NotificationType {
        NotificationType {
            display_name: Some("Alert".into()),
            ..NotificationType::new("alert")
        }
    }

    #[tokio::test]
    async fn notify_before_register_is_usage_error() {
        let daemon = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = Client::new(config(daemon.local_addr().unwrap().port()));
        let err = client.notify("alert", "t", "b").await.unwrap_err();
        assert!(matches!(err, ClientError::NotRegistered));
        assert!(!client.is_registered());
        let accepted = tokio::time::timeout(Duration::from_millis(200), daemon.accept()).await;
        assert!(accepted.is_err(), "notify connected before register");
    }

    #[tokio::test]
    async fn register_then_notify() {
        let (port, mut packets) = fake_daemon(OK).await;
        let client = Client::new(config(port));
        client.register(&[alert()]).await.unwrap();
        assert!(client.is_registered());
        let reg = packets.recv().await.unwrap();
        assert!(reg.starts_with("GNTP/1.0 REGISTER NONE\r\n"));
        assert!(reg.contains("Notifications-Count: 1\r\n"));

        let opts = NotifyOptions::default().with_sticky(true).with_priority(1);
        client
            .notify_with_options("alert", "Hello", "World", &opts)
            .await
            .unwrap();
        let note = packets.recv().await.unwrap();
        assert!(note.starts_with("GNTP/1.0 NOTIFY NONE\r\n"));
        assert!(note.contains("Notification-Sticky: True\r\n"));
        assert!(note.contains("Notification-Priority: 1\r\n"));
        assert!(!note.contains("Notification-Callback-Context"));
    }

    #[tokio::test]
    async fn failed_register_leaves_session_unregistered() {
        let (port, _packets) = fake_daemon("GNTP/1.0 -ERROR NONE\r\nError-Code: 300\r\n\r\n").await;
        let client = Client::new(config(port));
        let err = client.register(&[alert()]).await.unwrap_err();
        assert!(matches!(err, ClientError::Daemon(_)));
        assert!(!client.is_registered());
        assert!(matches!(
            client.notify("alert", "t", "b").await,
            Err(ClientError::NotRegistered)
        ));
    }

    #[tokio::test]
    async fn send_message_registers_once() {
        let (port, mut packets) = fake_daemon(OK).await;
        let client = Client::new(config(port));
        let msg = Message {
            event: "alert".into(),
            title: "Simple".into(),
            text: "Message".into(),
            callback: Some("https://example.com".into()),
            priority: 1,
            ..Message::default()
        };
        client.send_message(&msg).await.unwrap();
        client.send_message(&msg).await.unwrap();
        let kinds: Vec<String> = [
            packets.recv().await.unwrap(),
            packets.recv().await.unwrap(),
            packets.recv().await.unwrap(),
        ]
        .iter()
        .map(|p| p.lines().next().unwrap_or_default().to_string())
        .collect();
        assert_eq!(
            kinds,
            [
                "GNTP/1.0 REGISTER NONE",
                "GNTP/1.0 NOTIFY NONE",
                "GNTP/1.0 NOTIFY NONE"
            ]
        );
    }

    #[tokio::test]
    async fn send_message_with_missing_icon_is_resource_error() {
        let client = Client::new(config(1));
        let msg = Message {
            event: "alert".into(),
            icon: Some("/nonexistent/icon.png".into()),
            ..Message::default()
        };
        assert!(matches!(
            client.send_message(&msg).await,
            Err(ClientError::Resource(_))
        ));
    }

    #[tokio::test]
    async fn callback_listener_url_in_packets_and_dispatch() {
        let (port, mut packets) = fake_daemon(OK).await;
        let mut client = Client::new(ClientConfig {
            icon_mode: IconMode::DataUrl,
            ..config(port)
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let resolver: AddressResolver = Arc::new(|| IpAddr::V4(Ipv4Addr::LOCALHOST));
        client
            .listen_for_callbacks_with(
                Arc::new(move |info: CallbackInfo| {
                    let _ = tx.send(info);
                }),
                &resolver,
            )
            .await
            .unwrap();
        let url = client.callback_url().unwrap().to_string();
        assert!(url.starts_with("http://127.0.0.1:"));

        client.register(&[alert()]).await.unwrap();
        let reg = packets.recv().await.unwrap();
        assert!(reg.contains(&format!("Notification-Callback-Target: {url}\r\n")));

        let opts = NotifyOptions::default().with_callback_context("user_data_123");
        client
            .notify_with_options("alert", "t", "b", &opts)
            .await
            .unwrap();
        let note = packets.recv().await.unwrap();
        assert!(note.contains("Notification-Callback-Context: user_data_123\r\n"));
        assert!(note.contains("Notification-Callback-Context-Type: string\r\n"));
        let id = note
            .lines()
            .find_map(|l| l.strip_prefix("Notification-ID: "))
            .unwrap()
            .to_string();

        // daemon reports a click back to the announced URL
        let addr = url.trim_start_matches("http://").to_string();
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let cb = format!(
            "GNTP/1.0 -CALLBACK NONE\r\nNotification-ID: {id}\r\nNotification-Callback-Result: CLICK\r\nNotification-Callback-Context: user_data_123\r\n\r\n"
        );
        stream.write_all(cb.as_bytes()).await.unwrap();
        let mut ack = String::new();
        stream.read_to_string(&mut ack).await.unwrap();
        assert_eq!(ack, OK);

        let info = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.kind, CallbackKind::Click);
        assert_eq!(info.notification_id, id);
        assert_eq!(info.context, "user_data_123");
        client.close().await;
    }
}
