//! Session state shared between the read loop and application calls.
//!
//! Everything here sits behind one `tokio::sync::Mutex` in the client. A
//! dispatched unit holds the lock for its whole read-modify-write, and
//! transport writes happen under it too, so write order is total. Events and
//! callbacks are collected as [`Deferred`] work and run after the lock is
//! released.

use crate::transport::Transport;
use log::{debug, info, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::task::JoinHandle;
use xmppcore::node::jid::Jid;
use xmppcore::node::node::Node;
use xmppcore::outbound::OutboundQueue;
use xmppcore::presence::{PresenceEntry, PresenceTracker, build_initial_presence};
use xmppcore::request::{IqError, PendingRequests};
use xmppcore::roster::{RosterEntry, RosterStore};
use xmppcore::session::SessionState;
use xmppcore::types::events::Event;
use xmppcore::xml::DisplayableNode;

pub type ResponseCallback = Box<dyn FnOnce(Result<Node, IqError>) + Send>;
pub type RosterCallback = Box<dyn FnOnce(Result<Vec<RosterEntry>, IqError>) + Send>;
pub type ProbeCallback = Box<dyn FnOnce(PresenceEntry) + Send>;

/// What to do with the response to an outstanding request.
pub(crate) enum PendingRequest {
    Callback(ResponseCallback),
    /// A roster fetch: the result is applied to the roster store before the
    /// optional caller callback runs.
    Roster(Option<RosterCallback>),
}

impl PendingRequest {
    fn fail(self, error: IqError) -> Option<Deferred> {
        match self {
            PendingRequest::Callback(callback) => {
                Some(Deferred::Call(Box::new(move || callback(Err(error)))))
            }
            PendingRequest::Roster(Some(callback)) => {
                Some(Deferred::Call(Box::new(move || callback(Err(error)))))
            }
            PendingRequest::Roster(None) => None,
        }
    }
}

/// Work that must run after the session lock is dropped.
pub(crate) enum Deferred {
    Event(Event),
    Call(Box<dyn FnOnce() + Send>),
}

pub(crate) struct SessionCore {
    pub(crate) state: SessionState,
    pub(crate) outbound: OutboundQueue,
    pub(crate) presence: PresenceTracker,
    pub(crate) roster: RosterStore,
    pub(crate) pending: PendingRequests<PendingRequest>,
    /// Probe callbacks by bare address, each tagged so a caller can withdraw
    /// its own.
    pub(crate) probes: HashMap<Jid, Vec<(u64, ProbeCallback)>>,
    next_probe_id: u64,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) keepalive: Option<JoinHandle<()>>,
    /// Last presence the application published; rebroadcast by the keepalive.
    pub(crate) current_presence: Node,
}

impl Default for SessionCore {
    fn default() -> Self {
        Self {
            state: SessionState::default(),
            outbound: OutboundQueue::new(),
            presence: PresenceTracker::new(),
            roster: RosterStore::new(),
            pending: PendingRequests::new(),
            probes: HashMap::new(),
            next_probe_id: 0,
            transport: None,
            keepalive: None,
            current_presence: build_initial_presence(),
        }
    }
}

impl SessionCore {
    /// Writes `unit` now if the session is online and nothing is waiting
    /// ahead of it, otherwise queues it.
    pub(crate) async fn enqueue_or_send(&mut self, unit: Node) {
        if !self.state.is_online() || !self.outbound.is_empty() {
            debug!(target: "Client/Send", "Queueing until online: {}", DisplayableNode(&unit));
            self.outbound.enqueue(unit);
            return;
        }
        if let Err(unit) = self.write(unit).await {
            self.outbound.enqueue(unit);
        }
    }

    /// Writes straight to the transport, handing the unit back on failure.
    ///
    /// The returned future owns its transport handle and does not borrow the
    /// session, so it stays `Send` while callbacks live in the session.
    pub(crate) fn write(
        &self,
        unit: Node,
    ) -> impl Future<Output = Result<(), Node>> + Send + 'static {
        let transport = self.transport.clone();
        async move {
            let Some(transport) = transport else {
                return Err(unit);
            };
            debug!(target: "Client/Send", "{}", DisplayableNode(&unit));
            match transport.send(&unit).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!(target: "Client/Send", "Failed to write {}: {e:?}", unit.tag);
                    Err(unit)
                }
            }
        }
    }

    /// Drains the queue in enqueue order. On a failed write the unwritten
    /// remainder goes back to the front of the queue.
    pub(crate) async fn flush_outbound(&mut self) {
        let mut queued: VecDeque<Node> = self.outbound.take_all();
        if queued.is_empty() {
            return;
        }
        info!(target: "Client/Send", "Flushing {} queued units", queued.len());
        while let Some(unit) = queued.pop_front() {
            if let Err(unit) = self.write(unit).await {
                queued.push_front(unit);
                self.outbound.requeue_front(queued);
                return;
            }
        }
    }

    pub(crate) fn register_request(
        &mut self,
        id: String,
        request: PendingRequest,
    ) -> Result<(), IqError> {
        self.pending
            .register(id.clone(), request)
            .map_err(|_| IqError::DuplicateId(id))
    }

    /// Registers a one-shot probe callback for the bare form of `jid`.
    pub(crate) fn register_probe(&mut self, jid: &Jid, callback: ProbeCallback) -> u64 {
        let bare = jid.to_bare();
        let id = self.next_probe_id;
        self.next_probe_id += 1;
        self.presence.register_probe(&bare);
        self.probes.entry(bare).or_default().push((id, callback));
        id
    }

    /// Drops the callback registered under `id`. Once no callback is left
    /// for `jid` the probe itself is withdrawn.
    pub(crate) fn cancel_probe(&mut self, jid: &Jid, id: u64) {
        let bare = jid.to_bare();
        let Some(callbacks) = self.probes.get_mut(&bare) else {
            return;
        };
        callbacks.retain(|(probe_id, _)| *probe_id != id);
        if callbacks.is_empty() {
            self.probes.remove(&bare);
            self.presence.cancel_probe(&bare);
        }
    }

    /// Moves the session to `Closed`. Returns `None` if it already was.
    ///
    /// Pending requests are failed with [`IqError::SessionClosed`]. Probes,
    /// queued units and the presence and roster tables are kept for the next
    /// connection.
    pub(crate) fn close(&mut self) -> Option<Vec<Deferred>> {
        let previous = self.state.transition(SessionState::Closed).ok()?;
        debug!(target: "Client", "Session {previous} -> closed");

        if let Some(keepalive) = self.keepalive.take() {
            keepalive.abort();
        }
        self.transport = None;

        let abandoned = self.pending.drain();
        if !abandoned.is_empty() {
            info!(target: "Client/IQ", "Failing {} pending requests: session closed", abandoned.len());
        }
        Some(
            abandoned
                .into_iter()
                .filter_map(|(_, request)| request.fail(IqError::SessionClosed))
                .collect(),
        )
    }
}

/// Mutable view handed to stanza handlers for the duration of one dispatch.
pub(crate) struct DispatchContext<'a> {
    pub(crate) session: &'a mut SessionCore,
    pub(crate) deferred: Vec<Deferred>,
}

impl<'a> DispatchContext<'a> {
    pub(crate) fn new(session: &'a mut SessionCore) -> Self {
        Self {
            session,
            deferred: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.deferred.push(Deferred::Event(event));
    }

    pub(crate) fn call(&mut self, f: impl FnOnce() + Send + 'static) {
        self.deferred.push(Deferred::Call(Box::new(f)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use xmppcore::node::builder::NodeBuilder;

    fn unit(id: &str) -> Node {
        NodeBuilder::new("message").attr("id", id).build()
    }

    #[tokio::test]
    async fn test_units_queue_while_not_online() {
        let mut core = SessionCore::default();
        core.enqueue_or_send(unit("1")).await;
        core.state.transition(SessionState::Connecting).unwrap();
        core.enqueue_or_send(unit("2")).await;
        assert_eq!(core.outbound.len(), 2);
    }

    #[tokio::test]
    async fn test_flush_without_transport_keeps_order() {
        let mut core = SessionCore::default();
        core.outbound.enqueue(unit("1"));
        core.outbound.enqueue(unit("2"));
        core.flush_outbound().await;

        let ids: Vec<_> = core
            .outbound
            .take_all()
            .iter()
            .filter_map(|n| n.get_attr("id").map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_close_fails_pending_once() {
        let mut core = SessionCore::default();
        core.state.transition(SessionState::Connecting).unwrap();

        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = results.clone();
        core.register_request(
            "a-0".into(),
            PendingRequest::Callback(Box::new(move |r| {
                sink.lock().unwrap().push(r.is_err());
            })),
        )
        .unwrap();
        core.register_request("a-1".into(), PendingRequest::Roster(None))
            .unwrap();
        assert!(matches!(
            core.register_request("a-1".into(), PendingRequest::Roster(None)),
            Err(IqError::DuplicateId(_))
        ));

        let deferred = core.close().unwrap();
        assert_eq!(deferred.len(), 1);
        for d in deferred {
            if let Deferred::Call(f) = d {
                f();
            }
        }
        assert_eq!(*results.lock().unwrap(), vec![true]);
        assert!(core.pending.is_empty());
        assert!(core.close().is_none());
    }

    #[tokio::test]
    async fn test_sends_run_on_spawned_tasks_with_callbacks_pending() {
        use crate::config::ClientConfig;
        use crate::transport::TransportFactory;
        use crate::transport::memory::MemoryTransportFactory;

        let factory = MemoryTransportFactory::new();
        let config = ClientConfig::new("juliet@capulet.lit".parse().unwrap(), "secret");
        let (transport, _events) = factory.create_transport(&config).await.unwrap();
        let conn = factory.next_connection().await.unwrap();

        let mut core = SessionCore::default();
        core.state.transition(SessionState::Connecting).unwrap();
        core.state.transition(SessionState::Online).unwrap();
        core.transport = Some(transport);
        core.register_request("a-0".into(), PendingRequest::Callback(Box::new(|_| {})))
            .unwrap();
        core.register_probe(&"romeo@montague.lit".parse().unwrap(), Box::new(|_| {}));

        let session = Arc::new(tokio::sync::Mutex::new(core));
        let task = tokio::spawn(async move {
            let mut core = session.lock().await;
            core.enqueue_or_send(unit("1")).await;
            core.flush_outbound().await;
        });
        task.await.unwrap();

        assert_eq!(conn.sent().len(), 1);
    }

    #[test]
    fn test_cancel_probe_only_drops_its_own_callback() {
        let mut core = SessionCore::default();
        let romeo: Jid = "romeo@montague.lit".parse().unwrap();

        let first = core.register_probe(&romeo, Box::new(|_| {}));
        let second = core.register_probe(&romeo.clone().with_resource("orchard"), Box::new(|_| {}));

        core.cancel_probe(&romeo, first);
        assert_eq!(core.probes[&romeo].len(), 1);
        assert!(core.presence.is_probing(&romeo));

        core.cancel_probe(&romeo, second);
        assert!(core.probes.is_empty());
        assert!(!core.presence.is_probing(&romeo));
    }
}
