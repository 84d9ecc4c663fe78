use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use gvmkit_common::config::{Config, Secret};
use gvmkit_protocols::commands;
use gvmkit_protocols::xml::{DocumentFramer, XmlNode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, info};

use super::{ChannelError, SessionChannel};

const READ_CHUNK: usize = 64 * 1024;

/// Commands gvmd answers without a login.
const UNAUTHENTICATED: &[&str] = &["get_version", "authenticate"];

/// gvmd session over its local Unix socket.
///
/// Connects on first use and logs in before the first command that needs it.
/// Any failed exchange drops the connection; the next exchange reconnects and
/// logs in again.
pub struct UnixSessionChannel {
    socket_path: PathBuf,
    username: String,
    password: Secret,
    timeout: Duration,
    session: Option<Session>,
}

struct Session {
    stream: UnixStream,
    authenticated: bool,
}

impl UnixSessionChannel {
    pub fn new(socket_path: PathBuf, username: String, password: Secret, timeout: Duration) -> Self {
        Self {
            socket_path,
            username,
            password,
            timeout,
            session: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.socket_path.clone(),
            config.username.clone(),
            config.password.clone(),
            config.timeout,
        )
    }

    async fn try_exchange(&mut self, request: &XmlNode) -> Result<XmlNode, ChannelError> {
        if self.session.is_none() {
            let stream = UnixStream::connect(&self.socket_path).await?;
            debug!(socket = %self.socket_path.display(), "connected to manager");
            self.session = Some(Session {
                stream,
                authenticated: false,
            });
        }

        let timeout = self.timeout;
        let session = self.session.as_mut().ok_or(ChannelError::Disconnected)?;

        let needs_login = !UNAUTHENTICATED.contains(&request.name.as_str());
        if needs_login && !session.authenticated {
            let login = commands::authenticate(&self.username, self.password.expose());
            let reply = round_trip(&mut session.stream, &login, timeout).await?;
            check_login(&reply)?;
            session.authenticated = true;
            info!(user = %self.username, "authenticated with manager");
        }

        round_trip(&mut session.stream, request, timeout).await
    }
}

#[async_trait]
impl SessionChannel for UnixSessionChannel {
    async fn exchange(&mut self, request: &XmlNode) -> Result<XmlNode, ChannelError> {
        let result = self.try_exchange(request).await;
        if let Err(err) = &result {
            if self.session.take().is_some() {
                debug!(error = %err, "dropping manager session");
            }
        }
        result
    }
}

async fn round_trip(
    stream: &mut UnixStream,
    request: &XmlNode,
    timeout: Duration,
) -> Result<XmlNode, ChannelError> {
    let payload = request.to_xml();
    let exchange = async {
        stream.write_all(payload.as_bytes()).await?;
        read_document(stream).await
    };
    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| ChannelError::TimedOut(timeout))?
}

async fn read_document(stream: &mut UnixStream) -> Result<XmlNode, ChannelError> {
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut framer = DocumentFramer::new();

    let end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(ChannelError::Disconnected);
        }
        buf.extend_from_slice(&chunk[..n]);
        let framed = framer
            .feed(&chunk[..n])
            .map_err(|e| ChannelError::Framing(e.to_string()))?;
        if let Some(end) = framed {
            break end;
        }
    };

    buf.truncate(end);
    let text = String::from_utf8(buf).map_err(|e| ChannelError::Framing(e.to_string()))?;
    XmlNode::parse(&text).map_err(|e| ChannelError::Framing(e.to_string()))
}

fn check_login(reply: &XmlNode) -> Result<(), ChannelError> {
    if reply.name != "authenticate_response" {
        return Err(ChannelError::Framing(format!(
            "expected <authenticate_response>, got <{}>",
            reply.name
        )));
    }
    let status: u16 = reply
        .attr("status")
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ChannelError::Framing("authenticate response has no valid status".into()))?;

    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(ChannelError::Authentication {
            status,
            text: reply.attr("status_text").unwrap_or_default().to_string(),
        })
    }
}
