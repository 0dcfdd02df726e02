use crate::error::ClientError;
use serde::Deserialize;
use std::time::Duration;
use xmppcore::node::jid::Jid;

pub const DEFAULT_PORT: u16 = 5222;
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(75);

/// Connection settings handed to the transport factory on every connect.
///
/// Durations are given in whole seconds when loaded from JSON:
///
/// ```json
/// { "jid": "juliet@capulet.lit", "password": "r0m30", "keepalive_interval": 30 }
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub jid: Jid,
    pub password: String,
    /// Server to connect to. Falls back to the domain of `jid`.
    pub host: Option<String>,
    pub port: u16,
    /// Resource to bind, unless `jid` already carries one.
    pub resource: Option<String>,
    #[serde(with = "duration_secs")]
    pub keepalive_interval: Duration,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    pub auto_reconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            jid: Jid::default(),
            password: String::new(),
            host: None,
            port: DEFAULT_PORT,
            resource: None,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            auto_reconnect: true,
        }
    }
}

impl ClientConfig {
    pub fn new(jid: Jid, password: impl Into<String>) -> Self {
        Self {
            jid,
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.jid.is_empty() {
            return Err(ClientError::Config("jid is required".into()));
        }
        if self.keepalive_interval.is_zero() {
            return Err(ClientError::Config(
                "keepalive_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(&self.jid.domain)
    }

    /// The address to bind: `jid` with `resource` applied if it had none.
    pub fn full_jid(&self) -> Jid {
        match (&self.jid.resource, &self.resource) {
            (None, Some(resource)) => self.jid.clone().with_resource(resource.as_str()),
            _ => self.jid.clone(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
