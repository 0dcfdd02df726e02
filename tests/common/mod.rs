#![allow(dead_code)]

use simple_xmpp::node::builder::NodeBuilder;
use simple_xmpp::node::node::Node;
use simple_xmpp::transport::memory::{MemoryConnection, MemoryTransportFactory};
use simple_xmpp::types::events::{Event, EventHandler};
use simple_xmpp::{Client, ClientConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use xmppcore::ns;

pub const WAIT: Duration = Duration::from_secs(5);

struct Collector(mpsc::UnboundedSender<Event>);

impl EventHandler for Collector {
    fn handle_event(&self, event: &Event) {
        let _ = self.0.send(event.clone());
    }
}

pub struct Harness {
    pub client: Arc<Client>,
    pub factory: Arc<MemoryTransportFactory>,
    pub run: JoinHandle<()>,
    events: Mutex<mpsc::UnboundedReceiver<Event>>,
}

pub fn config() -> ClientConfig {
    ClientConfig::new("juliet@capulet.lit".parse().unwrap(), "r0m30").with_resource("balcony")
}

impl Harness {
    /// Starts the client's run loop and returns once it has opened its first
    /// transport.
    pub async fn start(config: ClientConfig) -> (Self, MemoryConnection) {
        let _ = env_logger::builder().is_test(true).try_init();

        let factory = MemoryTransportFactory::new();
        let client = Client::new(config, factory.clone()).expect("valid test config");
        let (tx, rx) = mpsc::unbounded_channel();
        client.add_event_handler(Arc::new(Collector(tx)));

        let runner = client.clone();
        let run = tokio::spawn(async move { runner.run().await });
        let conn = next_connection(&factory).await;

        (
            Self {
                client,
                factory,
                run,
                events: Mutex::new(rx),
            },
            conn,
        )
    }

    /// Next application event, skipping raw stanza notifications.
    pub async fn next_event(&self) -> Event {
        let mut events = self.events.lock().await;
        loop {
            let event = tokio::time::timeout(WAIT, events.recv())
                .await
                .expect("timed out waiting for an event")
                .expect("event channel closed");
            if !matches!(event, Event::Stanza(_)) {
                return event;
            }
        }
    }

    /// Events already delivered, without waiting.
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut events = self.events.lock().await;
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            if !matches!(event, Event::Stanza(_)) {
                drained.push(event);
            }
        }
        drained
    }

    pub async fn shutdown(self) {
        self.client.disconnect().await;
        let _ = tokio::time::timeout(WAIT, self.run).await;
    }
}

pub async fn next_connection(factory: &MemoryTransportFactory) -> MemoryConnection {
    tokio::time::timeout(WAIT, factory.next_connection())
        .await
        .expect("timed out waiting for a connection attempt")
        .expect("factory closed")
}

pub async fn wait_for_sent(conn: &MemoryConnection, count: usize) -> Vec<Node> {
    tokio::time::timeout(WAIT, conn.wait_for_sent(count))
        .await
        .expect("timed out waiting for outbound units")
}

/// Signals `Connected` and waits for the automatic initial presence and
/// roster request. Returns the roster request id.
pub async fn go_online(harness: &Harness, conn: &MemoryConnection) -> String {
    let already = conn.sent().len();
    conn.connected().await;
    // Online is raised only after every go-online write has been made.
    assert!(matches!(harness.next_event().await, Event::Online(_)));
    let roster_get = conn
        .sent()
        .into_iter()
        .skip(already)
        .find(|n| n.tag == "iq" && n.get_child_ns("query", ns::ROSTER).is_some())
        .expect("no roster request after going online");
    roster_get.get_attr("id").unwrap().to_string()
}

pub fn roster_result(id: &str, items: &[(&str, &str)]) -> Node {
    NodeBuilder::new("iq")
        .attr("type", "result")
        .attr("id", id)
        .children([NodeBuilder::new("query")
            .attr("xmlns", ns::ROSTER)
            .children(items.iter().map(|(jid, subscription)| {
                NodeBuilder::new("item")
                    .attr("jid", *jid)
                    .attr("subscription", *subscription)
                    .build()
            }))
            .build()])
        .build()
}

pub fn presence(from: &str, show: Option<&str>) -> Node {
    let builder = NodeBuilder::new("presence").attr("from", from);
    match show {
        Some(show) => builder
            .children([NodeBuilder::new("show").string_content(show).build()])
            .build(),
        None => builder.build(),
    }
}

pub fn ids(units: &[Node]) -> Vec<String> {
    units
        .iter()
        .filter_map(|n| n.get_attr("id").map(str::to_string))
        .collect()
}
