//! # Session Channel
//!
//! The one live connection to the manager. Everything above this module talks
//! to gvmd through [`SessionChannel::exchange`]: one request document in, one
//! response document out.
//!
//! The channel is shared as a [`SharedChannel`], so at most one exchange is in
//! flight per connection. Implementations reconnect and re-authenticate on
//! their own after a failure; callers only see [`ChannelError`] for the
//! exchange that failed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gvmkit_common::GmpError;
use gvmkit_protocols::XmlNode;
use thiserror::Error;
use tokio::sync::Mutex;

mod unix;

pub use unix::UnixSessionChannel;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("connection to the manager was lost")]
    Disconnected,

    #[error("no response within {0:?}")]
    TimedOut(Duration),

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("authentication failed ({status}): {text}")]
    Authentication { status: u16, text: String },

    #[error("unreadable response: {0}")]
    Framing(String),
}

impl From<ChannelError> for GmpError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Authentication { status, text } => GmpError::Remote {
                command: "authenticate".into(),
                status,
                text,
            },
            ChannelError::Framing(msg) => GmpError::Protocol(msg),
            other => GmpError::Transient(other.to_string()),
        }
    }
}

#[async_trait]
pub trait SessionChannel: Send {
    /// Sends one request and waits for the matching response document.
    async fn exchange(&mut self, request: &XmlNode) -> Result<XmlNode, ChannelError>;
}

pub type SharedChannel = Arc<Mutex<dyn SessionChannel>>;

pub fn shared<C: SessionChannel + 'static>(channel: C) -> SharedChannel {
    Arc::new(Mutex::new(channel))
}
