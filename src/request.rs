use crate::client::Client;
use crate::session::PendingRequest;
use log::warn;
use tokio::sync::oneshot;
use tokio::time::timeout;
use xmppcore::iq::IqSpec;
use xmppcore::node::node::Node;

pub use xmppcore::request::{InfoQuery, InfoQueryType, IqError};

impl Client {
    /// Session-scoped id: a random per-client prefix plus a counter.
    pub fn generate_request_id(&self) -> String {
        self.request_utils.generate_request_id()
    }

    /// Sends an IQ and registers `callback` for its response.
    ///
    /// The callback runs exactly once: with the `result` node, with
    /// [`IqError::ServerError`] for an `error` response, or with
    /// [`IqError::SessionClosed`] if the session closes first. Returns the
    /// request id.
    pub async fn send_iq_with<F>(&self, query: InfoQuery, callback: F) -> Result<String, IqError>
    where
        F: FnOnce(Result<Node, IqError>) + Send + 'static,
    {
        self.send_request(query, PendingRequest::Callback(Box::new(callback)))
            .await
    }

    pub(crate) async fn send_request(
        &self,
        query: InfoQuery,
        request: PendingRequest,
    ) -> Result<String, IqError> {
        let req_id = query
            .id
            .clone()
            .unwrap_or_else(|| self.generate_request_id());
        let node = self.request_utils.build_iq_node(&query, Some(req_id.clone()));

        let mut session = self.session.lock().await;
        session.register_request(req_id.clone(), request)?;
        session.enqueue_or_send(node).await;
        Ok(req_id)
    }

    /// Sends an IQ and waits for its response, up to the query's timeout or
    /// the configured request timeout.
    pub async fn send_iq(&self, query: InfoQuery) -> Result<Node, IqError> {
        let wait = query.timeout.unwrap_or(self.config.request_timeout);
        let (tx, rx) = oneshot::channel();
        let req_id = self
            .send_iq_with(query, move |result| {
                let _ = tx.send(result);
            })
            .await?;

        match timeout(wait, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(IqError::InternalChannelClosed),
            Err(_) => {
                if self.session.lock().await.pending.take(&req_id).is_some() {
                    warn!(target: "Client/IQ", "Request {req_id} timed out after {wait:?}");
                }
                Err(IqError::Timeout)
            }
        }
    }

    /// Runs an [`IqSpec`] and parses its response.
    pub async fn execute<S: IqSpec>(&self, spec: S) -> Result<S::Response, IqError> {
        let response = self.send_iq(spec.build_iq()).await?;
        spec.parse_response(&response)
            .map_err(|e| IqError::Parse(e.to_string()))
    }

    /// Callback form of [`Client::execute`].
    pub async fn execute_with<S, F>(&self, spec: S, callback: F) -> Result<String, IqError>
    where
        S: IqSpec + Send + 'static,
        F: FnOnce(Result<S::Response, IqError>) + Send + 'static,
    {
        let query = spec.build_iq();
        self.send_iq_with(query, move |result| {
            callback(result.and_then(|response| {
                spec.parse_response(&response)
                    .map_err(|e| IqError::Parse(e.to_string()))
            }))
        })
        .await
    }
}
