use crate::client::Client;
use crate::error::ClientError;
use crate::session::ProbeCallback;
use log::info;
use tokio::sync::oneshot;
use tokio::time::timeout;
use xmppcore::node::jid::Jid;
use xmppcore::node::node::Node;
use xmppcore::presence::{
    PresenceEntry, PresenceTable, SubscriptionKind, build_presence, build_probe,
    build_subscription,
};

/// Feature handle for presence operations.
pub struct Presence<'a> {
    client: &'a Client,
}

impl<'a> Presence<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Publishes availability with an optional `show` (`away`, `chat`,
    /// `dnd`, `xa`) and status text. The keepalive keeps rebroadcasting it.
    pub async fn set(&self, show: Option<&str>, status: Option<&str>) -> Result<(), ClientError> {
        let node = build_presence(show, status)?;
        info!(target: "Client/Presence", "Setting presence show={show:?} status={status:?}");
        self.publish(node).await;
        Ok(())
    }

    pub async fn set_status(&self, status: &str) -> Result<(), ClientError> {
        self.set(None, Some(status)).await
    }

    /// Asks `jid` to share their presence with us.
    pub async fn subscribe(&self, jid: &Jid) {
        self.send_subscription(jid, SubscriptionKind::Subscribe).await;
    }

    /// Approves an inbound subscription request from `jid`.
    pub async fn accept_subscription(&self, jid: &Jid) {
        self.send_subscription(jid, SubscriptionKind::Subscribed).await;
    }

    /// Refuses a request, or revokes a subscription `jid` already has.
    pub async fn deny_subscription(&self, jid: &Jid) {
        self.send_subscription(jid, SubscriptionKind::Unsubscribed)
            .await;
    }

    /// Stops receiving presence from `jid`.
    pub async fn unsubscribe(&self, jid: &Jid) {
        self.send_subscription(jid, SubscriptionKind::Unsubscribe)
            .await;
    }

    /// Probes `jid` for its current presence.
    ///
    /// `callback` fires once, with the next presence seen for `jid`. That
    /// update does not raise a general presence event.
    pub async fn probe<F>(&self, jid: &Jid, callback: F)
    where
        F: FnOnce(PresenceEntry) + Send + 'static,
    {
        self.register_probe(jid, Box::new(callback)).await;
    }

    /// Probes `jid` and waits for the answer, up to the request timeout.
    ///
    /// On timeout the probe is withdrawn, so the next update from `jid` is
    /// broadcast as usual.
    pub async fn fetch(&self, jid: &Jid) -> Result<PresenceEntry, ClientError> {
        let wait = self.client.config.request_timeout;
        let (tx, rx) = oneshot::channel();
        let probe_id = self
            .register_probe(
                jid,
                Box::new(move |entry| {
                    let _ = tx.send(entry);
                }),
            )
            .await;

        match timeout(wait, rx).await {
            Ok(Ok(entry)) => Ok(entry),
            _ => {
                self.client
                    .session
                    .lock()
                    .await
                    .cancel_probe(jid, probe_id);
                Err(ClientError::ProbeTimeout(wait))
            }
        }
    }

    /// Last known presence of `jid`.
    pub async fn get(&self, jid: &Jid) -> Option<PresenceEntry> {
        self.client.session.lock().await.presence.get(jid).cloned()
    }

    pub async fn table(&self) -> PresenceTable {
        self.client.session.lock().await.presence.snapshot()
    }

    async fn register_probe(&self, jid: &Jid, callback: ProbeCallback) -> u64 {
        let mut session = self.client.session.lock().await;
        let probe_id = session.register_probe(jid, callback);
        session.enqueue_or_send(build_probe(jid)).await;
        probe_id
    }

    async fn publish(&self, node: Node) {
        let mut session = self.client.session.lock().await;
        session.current_presence = node.clone();
        session.enqueue_or_send(node).await;
    }

    async fn send_subscription(&self, jid: &Jid, kind: SubscriptionKind) {
        info!(target: "Client/Presence", "Sending {} to {}", kind.as_str(), jid.to_bare());
        self.client
            .send_node(build_subscription(jid, kind))
            .await;
    }
}

impl Client {
    /// Access presence operations.
    pub fn presence(&self) -> Presence<'_> {
        Presence::new(self)
    }
}
