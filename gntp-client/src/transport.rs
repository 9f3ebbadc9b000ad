//! Outbound exchange: one TCP connection per request. Header block, then raw
//! resource blocks, then read the response until a blank line or close.

use std::io::ErrorKind;
use std::time::Duration;

use gntp_core::{validate_response, Packet, CRLF};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

use crate::error::{ClientError, Phase};

/// Send `packet` to `addr` and return the validated response text.
/// `deadline` bounds the connect, then separately the whole exchange.
pub async fn send_packet(
    addr: &str,
    deadline: Duration,
    packet: &Packet,
    debug: bool,
) -> Result<String, ClientError> {
    log::debug!("connecting to {}", addr);
    let mut stream = match timeout(deadline, TcpStream::connect(addr)).await {
        Ok(Ok(s)) => s,
        Ok(Err(source)) => {
            return Err(ClientError::Connect {
                addr: addr.to_string(),
                source,
            })
        }
        Err(_) => return Err(timed_out(addr, Phase::Connect)),
    };
    let until = Instant::now() + deadline;

    match timeout_at(until, write_packet(&mut stream, packet)).await {
        Ok(Ok(())) => {}
        Ok(Err(source)) => {
            return Err(ClientError::Write {
                addr: addr.to_string(),
                source,
            })
        }
        Err(_) => return Err(timed_out(addr, Phase::Write)),
    }
    log::debug!(
        "sent {} header bytes and {} resource(s) to {}",
        packet.header().len(),
        packet.resources().len(),
        addr
    );

    let response = match timeout_at(until, read_response(&mut stream)).await {
        Ok(Ok(r)) => r,
        Ok(Err(source)) => {
            return Err(ClientError::Read {
                addr: addr.to_string(),
                source,
            })
        }
        Err(_) => return Err(timed_out(addr, Phase::Read)),
    };
    if debug {
        log::debug!("response from {}:\n{}", addr, response);
    }
    validate_response(&response)?;
    Ok(response)
}

fn timed_out(addr: &str, phase: Phase) -> ClientError {
    ClientError::Timeout {
        addr: addr.to_string(),
        phase,
    }
}

/// Header, then each resource followed by CRLF, then a closing CRLF.
/// Without resources the header's own blank line ends the message.
pub async fn write_packet<W: AsyncWrite + Unpin>(w: &mut W, packet: &Packet) -> std::io::Result<()> {
    w.write_all(packet.header().as_bytes()).await?;
    if !packet.resources().is_empty() {
        for res in packet.resources() {
            w.write_all(res.data()).await?;
            w.write_all(CRLF.as_bytes()).await?;
        }
        w.write_all(CRLF.as_bytes()).await?;
    }
    w.flush().await
}

/// Read lines until a blank line. EOF and connection reset also end the
/// response; some daemons close right after replying.
pub async fn read_response<R: AsyncRead + Unpin>(r: &mut R) -> std::io::Result<String> {
    let mut reader = BufReader::new(r);
    let mut response = String::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if is_closed(&e) => break,
            Err(e) => return Err(e),
        }
        let text = String::from_utf8_lossy(&line);
        response.push_str(&text);
        if text.trim().is_empty() {
            break;
        }
    }
    Ok(response)
}

fn is_closed(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}
