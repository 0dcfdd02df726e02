use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handlers::iq::IqHandler;
use crate::handlers::message::MessageHandler;
use crate::handlers::presence::PresenceHandler;
use crate::handlers::router::StanzaRouter;
use crate::session::{Deferred, DispatchContext, PendingRequest, SessionCore};
use crate::transport::{TransportEvent, TransportFactory};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::time::sleep;
use xmppcore::iq::IqSpec;
use xmppcore::iq::roster::RosterGetSpec;
use xmppcore::node::node::Node;
use xmppcore::presence::build_initial_presence;
use xmppcore::request::RequestUtils;
use xmppcore::session::SessionState;
use xmppcore::types::events::{
    CoreEventBus, Disconnected, ErrorEvent, Event, EventHandler, Online, SharedData,
};
use xmppcore::xml::DisplayableNode;

const MAX_RECONNECT_DELAY_SECS: u64 = 30;

pub struct Client {
    pub(crate) config: ClientConfig,
    pub(crate) session: Mutex<SessionCore>,
    pub(crate) request_utils: RequestUtils,
    pub(crate) event_bus: CoreEventBus,
    pub(crate) stanza_router: StanzaRouter,
    pub(crate) transport_factory: Arc<dyn TransportFactory>,

    pub(crate) is_connecting: AtomicBool,
    pub(crate) is_running: AtomicBool,
    pub(crate) expected_disconnect: AtomicBool,
    pub(crate) shutdown_notifier: Notify,

    pub enable_auto_reconnect: AtomicBool,
    pub auto_reconnect_errors: AtomicU32,
    pub last_successful_connect: Mutex<Option<DateTime<Utc>>>,
}

impl Client {
    /// Builds a client after checking `config` with [`ClientConfig::validate`].
    pub fn new(
        config: ClientConfig,
        transport_factory: Arc<dyn TransportFactory>,
    ) -> Result<Arc<Self>, ClientError> {
        config.validate()?;
        let enable_auto_reconnect = AtomicBool::new(config.auto_reconnect);
        Ok(Arc::new(Self {
            config,
            session: Mutex::new(SessionCore::default()),
            request_utils: RequestUtils::with_random_prefix(),
            event_bus: CoreEventBus::new(),
            stanza_router: Self::create_stanza_router(),
            transport_factory,
            is_connecting: AtomicBool::new(false),
            is_running: AtomicBool::new(false),
            expected_disconnect: AtomicBool::new(false),
            shutdown_notifier: Notify::new(),
            enable_auto_reconnect,
            auto_reconnect_errors: AtomicU32::new(0),
            last_successful_connect: Mutex::new(None),
        }))
    }

    fn create_stanza_router() -> StanzaRouter {
        let mut router = StanzaRouter::new();
        router.register(Arc::new(MessageHandler));
        router.register(Arc::new(PresenceHandler));
        router.register(Arc::new(IqHandler));
        router
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.event_bus.add_handler(handler);
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state
    }

    pub async fn is_online(&self) -> bool {
        self.state().await.is_online()
    }

    /// Connects and keeps the session alive until [`Client::disconnect`] is
    /// called, or until the connection drops with auto-reconnect disabled.
    pub async fn run(self: &Arc<Self>) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!("Client `run` method called while already running.");
            return;
        }
        while self.is_running.load(Ordering::Relaxed) {
            self.expected_disconnect.store(false, Ordering::Relaxed);

            match self.connect().await {
                Err(e) => error!("Failed to connect: {e}, will retry..."),
                Ok(transport_events) => {
                    if let Err(e) = self.read_messages_loop(transport_events).await {
                        warn!("Message loop exited with an error: {e}. Will attempt to reconnect if enabled.");
                    } else if self.expected_disconnect.load(Ordering::Relaxed) {
                        debug!("Message loop exited gracefully (expected disconnect).");
                    } else {
                        info!("Message loop exited gracefully.");
                    }
                    self.cleanup_connection_state().await;
                }
            }

            if self.expected_disconnect.load(Ordering::Relaxed) {
                self.is_running.store(false, Ordering::Relaxed);
                break;
            }
            if !self.enable_auto_reconnect.load(Ordering::Relaxed) {
                info!("Auto-reconnect disabled, shutting down.");
                self.is_running.store(false, Ordering::Relaxed);
                break;
            }

            let error_count = self.auto_reconnect_errors.fetch_add(1, Ordering::SeqCst);
            let delay_secs = u64::from(error_count * 2).min(MAX_RECONNECT_DELAY_SECS);
            let delay = Duration::from_secs(delay_secs);
            info!(
                "Will attempt to reconnect in {:?} (attempt {})",
                delay,
                error_count + 1
            );
            sleep(delay).await;
        }
        info!("Client run loop has shut down.");
    }

    /// Opens a transport and enters `Connecting`. The session goes online
    /// when the transport reports [`TransportEvent::Connected`].
    pub async fn connect(self: &Arc<Self>) -> Result<mpsc::Receiver<TransportEvent>, ClientError> {
        if self.is_connecting.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyConnected);
        }
        let _guard = scopeguard::guard((), |_| {
            self.is_connecting.store(false, Ordering::Relaxed);
        });

        {
            let mut session = self.session.lock().await;
            if session.state != SessionState::Closed {
                return Err(ClientError::AlreadyConnected);
            }
            session.state.transition(SessionState::Connecting)?;
        }

        info!(
            "Connecting to {}:{} as {}",
            self.config.host(),
            self.config.port,
            self.config.full_jid()
        );
        match self.transport_factory.create_transport(&self.config).await {
            Ok((transport, transport_events)) => {
                self.session.lock().await.transport = Some(transport);
                Ok(transport_events)
            }
            Err(e) => {
                self.session.lock().await.close();
                Err(ClientError::Transport(e))
            }
        }
    }

    /// Closes the session on purpose. No reconnect follows.
    pub async fn disconnect(&self) {
        info!("Disconnecting client intentionally.");
        self.expected_disconnect.store(true, Ordering::Relaxed);
        self.is_running.store(false, Ordering::Relaxed);
        self.shutdown_notifier.notify_waiters();

        let transport = self.session.lock().await.transport.clone();
        if let Some(transport) = transport {
            transport.disconnect().await;
        }
        self.cleanup_connection_state().await;
    }

    async fn cleanup_connection_state(&self) {
        let Some(deferred) = self.session.lock().await.close() else {
            return;
        };
        self.run_deferred(deferred);

        let will_reconnect = self.is_running.load(Ordering::Relaxed)
            && !self.expected_disconnect.load(Ordering::Relaxed)
            && self.enable_auto_reconnect.load(Ordering::Relaxed);
        self.event_bus
            .dispatch(&Event::Disconnected(Disconnected { will_reconnect }));
    }

    async fn read_messages_loop(
        self: &Arc<Self>,
        mut transport_events: mpsc::Receiver<TransportEvent>,
    ) -> Result<(), anyhow::Error> {
        info!(target: "Client", "Starting message processing loop...");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_notifier.notified() => {
                    info!(target: "Client", "Shutdown signaled in message loop. Exiting message loop.");
                    return Ok(());
                },
                event = transport_events.recv() => {
                    match event {
                        Some(TransportEvent::Connected) => self.handle_online().await,
                        Some(TransportEvent::StanzaReceived(node)) => self.process_node(node).await,
                        Some(TransportEvent::Error(e)) => {
                            warn!(target: "Client", "Transport error: {e}");
                            self.event_bus.dispatch(&Event::Error(ErrorEvent::Transport(e)));
                        }
                        Some(TransportEvent::Disconnected) | None => {
                            if self.expected_disconnect.load(Ordering::Relaxed) {
                                info!("Transport disconnected as expected.");
                                return Ok(());
                            }
                            info!("Transport disconnected unexpectedly.");
                            return Err(anyhow::anyhow!("Transport disconnected unexpectedly"));
                        }
                    }
                }
            }
        }
    }

    /// `Connecting -> Online`. In one critical section: announce presence,
    /// flush the queue, request the roster and start the keepalive. Nothing
    /// the application sends can be interleaved with these writes.
    ///
    /// [`Event::Online`] is raised only after the section ends, so a handler
    /// that sends in response to it is written after every queued unit and
    /// after the roster request.
    async fn handle_online(self: &Arc<Self>) {
        {
            let mut session = self.session.lock().await;
            if let Err(e) = session.state.transition(SessionState::Online) {
                warn!(target: "Client", "Ignoring connected signal: {e}");
                return;
            }
            info!(target: "Client", "Session is online.");

            if let Err(unit) = session.write(build_initial_presence()).await {
                session.outbound.requeue_front([unit].into());
            }
            session.flush_outbound().await;

            let roster_get = RosterGetSpec::new().build_iq();
            let id = self.generate_request_id();
            match session.register_request(id.clone(), PendingRequest::Roster(None)) {
                Ok(()) => {
                    let node = self.request_utils.build_iq_node(&roster_get, Some(id));
                    session.enqueue_or_send(node).await;
                }
                Err(e) => warn!(target: "Client/Roster", "Could not request roster: {e}"),
            }

            if let Some(previous) = session.keepalive.take() {
                previous.abort();
            }
            let client = self.clone();
            let interval = self.config.keepalive_interval;
            session.keepalive = Some(tokio::spawn(async move {
                client.keepalive_loop(interval).await
            }));
        }

        self.auto_reconnect_errors.store(0, Ordering::Relaxed);
        *self.last_successful_connect.lock().await = Some(Utc::now());
        self.event_bus.dispatch(&Event::Online(Online));
    }

    /// Dispatches one inbound unit. Units are processed strictly one at a
    /// time, in arrival order.
    pub(crate) async fn process_node(&self, node: Node) {
        info!(target: "Client/Recv", "{}", DisplayableNode(&node));
        self.event_bus
            .dispatch(&Event::Stanza(SharedData::new(node.clone())));

        let deferred = {
            let mut session = self.session.lock().await;
            let mut ctx = DispatchContext::new(&mut session);
            if !self.stanza_router.dispatch(self, &mut ctx, &node).await {
                warn!(target: "Client", "Received unknown top-level node: {}", DisplayableNode(&node));
            }
            ctx.deferred
        };
        self.run_deferred(deferred);
    }

    pub(crate) fn run_deferred(&self, deferred: Vec<Deferred>) {
        for work in deferred {
            match work {
                Deferred::Event(event) => self.event_bus.dispatch(&event),
                Deferred::Call(callback) => callback(),
            }
        }
    }
}
