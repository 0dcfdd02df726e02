use crate::client::Client;
use crate::error::ClientError;
use crate::session::PendingRequest;
use tokio::sync::oneshot;
use tokio::time::timeout;
use xmppcore::iq::IqSpec;
use xmppcore::iq::roster::RosterGetSpec;
use xmppcore::node::jid::Jid;
use xmppcore::request::IqError;
use xmppcore::roster::{RosterEntry, RosterSnapshot};

/// Feature handle for the contact list.
pub struct Roster<'a> {
    client: &'a Client,
}

impl<'a> Roster<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetches the full roster. The result replaces the local roster and
    /// raises a roster event before `callback` runs.
    pub async fn load<F>(&self, callback: F) -> Result<String, IqError>
    where
        F: FnOnce(Result<Vec<RosterEntry>, IqError>) + Send + 'static,
    {
        self.client
            .send_request(
                RosterGetSpec::new().build_iq(),
                PendingRequest::Roster(Some(Box::new(callback))),
            )
            .await
    }

    /// Fetches the full roster and waits for it.
    pub async fn fetch(&self) -> Result<Vec<RosterEntry>, ClientError> {
        let wait = self.client.config.request_timeout;
        let (tx, rx) = oneshot::channel();
        let req_id = self
            .load(move |result| {
                let _ = tx.send(result);
            })
            .await?;

        match timeout(wait, rx).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(_)) => Err(IqError::InternalChannelClosed.into()),
            Err(_) => {
                self.client.session.lock().await.pending.take(&req_id);
                Err(IqError::Timeout.into())
            }
        }
    }

    pub async fn get(&self, jid: &Jid) -> Option<RosterEntry> {
        self.client.session.lock().await.roster.get(jid).cloned()
    }

    pub async fn snapshot(&self) -> RosterSnapshot {
        self.client.session.lock().await.roster.snapshot()
    }
}

impl Client {
    /// Access roster operations.
    pub fn roster(&self) -> Roster<'_> {
        Roster::new(self)
    }
}
