use thiserror::Error;
use xmppcore::presence::PresenceError;
use xmppcore::request::IqError;
use xmppcore::session::SessionError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client is already connected")]
    AlreadyConnected,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to open transport: {0}")]
    Transport(anyhow::Error),
    #[error(transparent)]
    Iq(#[from] IqError),
    #[error(transparent)]
    Presence(#[from] PresenceError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("no presence answer to the probe within {0:?}")]
    ProbeTimeout(std::time::Duration),
}
