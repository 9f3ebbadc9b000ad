//! Callback listener: inbound TCP server on an ephemeral port. One supervised
//! task per connection; each reads one callback message, acknowledges it and
//! hands it to the user handler.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gntp_core::{acknowledgement, CallbackInfo};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

/// Called once per received callback, possibly from several tasks at once.
pub type CallbackHandler = Arc<dyn Fn(CallbackInfo) + Send + Sync>;

/// Returns the address the daemon should use to reach this host.
pub type AddressResolver = Arc<dyn Fn() -> IpAddr + Send + Sync>;

/// Upper bound on one inbound callback message.
pub const MAX_CALLBACK_LEN: usize = 64 * 1024;

/// Connections handled concurrently; further accepts wait for a slot.
pub const MAX_IN_FLIGHT: usize = 64;

const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Best-effort outward-facing IPv4 address. Asks the routing table through a
/// connected UDP socket (nothing is sent). Falls back to loopback.
pub fn local_ipv4() -> IpAddr {
    let route = || -> std::io::Result<IpAddr> {
        let sock = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        sock.connect((Ipv4Addr::new(192, 0, 2, 1), 9))?;
        Ok(sock.local_addr()?.ip())
    };
    match route() {
        Ok(ip) if !ip.is_loopback() && !ip.is_unspecified() => ip,
        _ => IpAddr::V4(Ipv4Addr::LOCALHOST),
    }
}

pub fn default_resolver() -> AddressResolver {
    Arc::new(local_ipv4)
}

/// Running listener. Dropping it without `shutdown` also stops the accept
/// loop, but does not wait for in-flight handlers.
pub struct CallbackListener {
    local_addr: SocketAddr,
    url: String,
    shutdown_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl CallbackListener {
    /// Bind on all interfaces, ephemeral port.
    pub async fn bind(
        handler: CallbackHandler,
        resolver: &AddressResolver,
    ) -> std::io::Result<Self> {
        Self::bind_on((Ipv4Addr::UNSPECIFIED, 0).into(), handler, resolver).await
    }

    pub async fn bind_on(
        bind: SocketAddr,
        handler: CallbackHandler,
        resolver: &AddressResolver,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind).await?;
        let local_addr = listener.local_addr()?;
        let url = format!("http://{}", SocketAddr::new(resolver(), local_addr.port()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(listener, handler, shutdown_rx));
        log::debug!("callback listener on {} ({})", local_addr, url);
        Ok(Self {
            local_addr,
            url,
            shutdown_tx,
            accept_task,
        })
    }

    /// Callback target URL announced in REGISTER.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait for in-flight handlers to return.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.accept_task.await {
            log::warn!("callback accept loop ended abnormally: {}", e);
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: CallbackHandler,
    mut shutdown: watch::Receiver<bool>,
) {
    let slots = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let mut tasks = JoinSet::new();
    loop {
        let permit = tokio::select! {
            _ = shutdown.changed() => break,
            p = slots.clone().acquire_owned() => match p {
                Ok(p) => p,
                Err(_) => break,
            },
        };
        let accepted = tokio::select! {
            _ = shutdown.changed() => break,
            a = listener.accept() => a,
        };
        match accepted {
            Ok((stream, peer)) => {
                let handler = handler.clone();
                tasks.spawn(async move {
                    let _permit = permit;
                    handle_connection(stream, peer, handler).await;
                });
            }
            Err(e) => {
                log::debug!("callback accept failed, closing listener: {}", e);
                break;
            }
        }
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                log::warn!("callback handler panicked: {}", e);
            }
        }
    }
    drop(listener);
    while let Some(done) = tasks.join_next().await {
        if let Err(e) = done {
            log::warn!("callback handler panicked: {}", e);
        }
    }
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, handler: CallbackHandler) {
    let message = match tokio::time::timeout(READ_TIMEOUT, read_message(&mut stream)).await {
        Ok(Ok(m)) => m,
        Ok(Err(e)) => {
            log::debug!("dropping callback from {}: {}", peer, e);
            return;
        }
        Err(_) => {
            log::debug!("dropping callback from {}: read timed out", peer);
            return;
        }
    };
    let info = match CallbackInfo::parse(&message, Utc::now()) {
        Ok(info) => info,
        Err(e) => {
            log::debug!("dropping callback from {}: {}", peer, e);
            return;
        }
    };
    if let Err(e) = stream.write_all(acknowledgement().as_bytes()).await {
        log::debug!("failed to acknowledge callback from {}: {}", peer, e);
    }
    let _ = stream.shutdown().await;
    drop(stream);
    log::debug!("callback {} for {}", info.kind, info.notification_id);
    // handlers are synchronous and may block
    if let Err(e) = tokio::task::spawn_blocking(move || handler(info)).await {
        log::warn!("callback handler for {} panicked: {}", peer, e);
    }
}

/// Read one message: lines up to a blank line or EOF, at most `MAX_CALLBACK_LEN` bytes.
async fn read_message(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream.take(MAX_CALLBACK_LEN as u64 + 1));
    let mut message = Vec::new();
    loop {
        let start = message.len();
        let n = reader.read_until(b'\n', &mut message).await?;
        if n == 0 {
            break;
        }
        if message.len() > MAX_CALLBACK_LEN {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "callback message too large",
            ));
        }
        if message[start..].iter().all(|b| b.is_ascii_whitespace()) {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&message).into_owned())
}
