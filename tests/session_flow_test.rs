mod common;

use common::{Harness, config, go_online, ids, next_connection, roster_result, wait_for_sent};
use simple_xmpp::types::events::Event;
use simple_xmpp::{Jid, SessionState};
use std::sync::{Arc, Mutex};
use xmppcore::request::{InfoQuery, IqError};

fn romeo() -> Jid {
    "romeo@montague.lit".parse().unwrap()
}

#[tokio::test]
async fn chat_sent_before_online_is_written_once_between_presence_and_roster_get() {
    let (harness, conn) = Harness::start(config()).await;
    let id = harness.client.send_message(&romeo(), "wherefore art thou").await;
    assert!(conn.sent().is_empty());

    conn.connected().await;
    let sent = wait_for_sent(&conn, 3).await;

    assert_eq!(sent[0].tag, "presence");
    assert_eq!(sent[1].tag, "message");
    assert_eq!(sent[1].get_attr("id"), Some(id.as_str()));
    assert_eq!(sent[1].child_text("body"), Some("wherefore art thou"));
    assert_eq!(sent[2].tag, "iq");

    let messages = conn.sent().iter().filter(|n| n.tag == "message").count();
    assert_eq!(messages, 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn queued_units_flush_in_order_before_later_sends() {
    let (harness, conn) = Harness::start(config()).await;
    let mut queued = Vec::new();
    for i in 0..5 {
        queued.push(harness.client.send_message(&romeo(), &format!("m{i}")).await);
    }

    go_online(&harness, &conn).await;
    let after = harness.client.send_message(&romeo(), "late").await;
    let sent = wait_for_sent(&conn, 8).await;

    let message_ids: Vec<String> = ids(
        &sent
            .into_iter()
            .filter(|n| n.tag == "message")
            .collect::<Vec<_>>(),
    );
    let mut expected = queued.clone();
    expected.push(after);
    assert_eq!(message_ids, expected);

    harness.shutdown().await;
}

#[tokio::test]
async fn roster_loads_automatically_once_per_connection() {
    let (harness, conn) = Harness::start(config()).await;
    let roster_id = go_online(&harness, &conn).await;

    conn.receive(roster_result(&roster_id, &[("a@x", "both")])).await;
    match harness.next_event().await {
        Event::Roster(update) => {
            assert!(!update.pushed);
            let entry = update.roster.get(&"a@x".parse().unwrap()).unwrap();
            assert_eq!(entry.subscription, "both");
            assert_eq!(entry.name, None);
        }
        other => panic!("expected roster event, got {other:?}"),
    }

    let roster_gets = conn
        .sent()
        .iter()
        .filter(|n| n.tag == "iq" && n.get_attr("type") == Some("get"))
        .count();
    assert_eq!(roster_gets, 1);
    assert_eq!(harness.client.roster().snapshot().await.len(), 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn close_fails_pending_and_reconnect_preserves_state() {
    let (harness, conn) = Harness::start(config()).await;
    let roster_id = go_online(&harness, &conn).await;
    conn.receive(roster_result(&roster_id, &[("a@x", "both")])).await;
    harness.next_event().await;
    conn.receive(common::presence("a@x/phone", Some("away"))).await;
    harness.next_event().await;

    let outcome = Arc::new(Mutex::new(Vec::new()));
    let sink = outcome.clone();
    harness
        .client
        .send_iq_with(InfoQuery::get(None, None), move |result| {
            sink.lock().unwrap().push(result);
        })
        .await
        .unwrap();

    conn.close().await;
    match harness.next_event().await {
        Event::Disconnected(d) => assert!(d.will_reconnect),
        other => panic!("expected disconnect, got {other:?}"),
    }
    {
        let outcome = outcome.lock().unwrap();
        assert_eq!(outcome.len(), 1);
        assert!(matches!(outcome[0], Err(IqError::SessionClosed)));
    }

    // Sent while closed: queued for the next connection.
    let queued = harness.client.send_message(&romeo(), "still there?").await;

    let conn2 = next_connection(&harness.factory).await;
    assert_eq!(harness.client.state().await, SessionState::Connecting);
    conn2.connected().await;
    let sent = wait_for_sent(&conn2, 3).await;
    assert_eq!(sent[0].tag, "presence");
    assert_eq!(sent[1].get_attr("id"), Some(queued.as_str()));
    assert_eq!(sent[2].tag, "iq");
    assert!(matches!(harness.next_event().await, Event::Online(_)));

    assert_eq!(harness.client.roster().snapshot().await.len(), 1);
    assert!(harness.client.presence().get(&"a@x".parse().unwrap()).await.is_some());
    assert_eq!(outcome.lock().unwrap().len(), 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn intentional_disconnect_does_not_reconnect() {
    let (mut harness, conn) = Harness::start(config()).await;
    go_online(&harness, &conn).await;

    harness.client.disconnect().await;
    match harness.next_event().await {
        Event::Disconnected(d) => assert!(!d.will_reconnect),
        other => panic!("expected disconnect, got {other:?}"),
    }
    assert!(conn.is_closed());
    assert_eq!(harness.client.state().await, SessionState::Closed);

    tokio::time::timeout(common::WAIT, &mut harness.run)
        .await
        .unwrap()
        .unwrap();
    assert!(harness.drain_events().await.is_empty());
}

#[tokio::test]
async fn transport_error_is_reported_without_closing() {
    let (harness, conn) = Harness::start(config()).await;
    go_online(&harness, &conn).await;

    conn.error("tls alert").await;
    match harness.next_event().await {
        Event::Error(simple_xmpp::types::events::ErrorEvent::Transport(e)) => {
            assert_eq!(e, "tls alert")
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert!(harness.client.is_online().await);

    harness.shutdown().await;
}

#[tokio::test]
async fn failed_connect_is_retried() {
    let (harness, conn) = Harness::start(config()).await;
    harness.factory.refuse_next(1);
    conn.close().await;
    assert!(matches!(harness.next_event().await, Event::Disconnected(_)));

    // First retry is immediate and refused, the second one opens a transport.
    let conn2 = next_connection(&harness.factory).await;
    go_online(&harness, &conn2).await;
    assert!(harness.client.is_online().await);

    harness.shutdown().await;
}

struct SendOnOnline(std::sync::OnceLock<Arc<simple_xmpp::Client>>);

impl simple_xmpp::types::events::EventHandler for SendOnOnline {
    fn handle_event(&self, event: &Event) {
        if let (Event::Online(_), Some(client)) = (event, self.0.get()) {
            let client = client.clone();
            tokio::spawn(async move {
                client.send_message(&romeo(), "good morrow").await;
            });
        }
    }
}

#[tokio::test]
async fn send_reacting_to_online_follows_the_roster_request() {
    let (harness, conn) = Harness::start(config()).await;
    let handler = Arc::new(SendOnOnline(std::sync::OnceLock::new()));
    let _ = handler.0.set(harness.client.clone());
    harness.client.add_event_handler(handler);

    conn.connected().await;
    let sent = wait_for_sent(&conn, 3).await;
    assert_eq!(sent[0].tag, "presence");
    assert_eq!(sent[1].tag, "iq");
    assert_eq!(sent[2].child_text("body"), Some("good morrow"));

    harness.shutdown().await;
}
