use crate::client::Client;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

impl Client {
    /// Rebroadcasts the current presence every `interval` while online.
    ///
    /// Spawned on entering `Online`; the session aborts the task when it
    /// closes.
    pub(crate) async fn keepalive_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let mut session = self.session.lock().await;
            if !session.state.is_online() {
                debug!(target: "Client/Keepalive", "Not online, exiting keepalive loop.");
                return;
            }
            debug!(target: "Client/Keepalive", "Sending keepalive presence");
            let presence = session.current_presence.clone();
            session.enqueue_or_send(presence).await;
        }
    }
}
