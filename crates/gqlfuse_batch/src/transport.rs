//! Sending a composed batch and splitting its response.
//!
//! The crate ships no HTTP client. Callers plug one in by implementing
//! [`Transport`]:
//!
//! ```ignore
//! use gqlfuse_batch::{GraphQLRequest, GraphQLResponse, Transport, TransportError};
//!
//! struct Http { client: reqwest::Client, url: String }
//!
//! #[async_trait::async_trait]
//! impl Transport for Http {
//!     async fn execute(&self, request: GraphQLRequest) -> Result<GraphQLResponse, TransportError> {
//!         let response = self.client.post(&self.url).json(&request).send().await
//!             .map_err(|e| TransportError::retryable(e.to_string()))?;
//!         response.json().await.map_err(|e| TransportError::new(e.to_string()))
//!     }
//! }
//! ```

use crate::batch::{BatchConfig, BatchItem, Composer};
use crate::demux::ComposedResult;
use crate::error::{ComposeResult, TransportError};
use crate::namespace::{IndexedNamespace, NamespacePolicy};
use crate::response::{GraphQLRequest, GraphQLResponse};
use async_trait::async_trait;
use gqlfuse_syntax::OperationDefinition;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends one GraphQL request and returns the decoded response.
///
/// A transport must send the request as-is: no splitting, no reordering.
/// Retries, if any, belong to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: GraphQLRequest) -> Result<GraphQLResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: GraphQLRequest) -> Result<GraphQLResponse, TransportError> {
        (**self).execute(request).await
    }
}

/// Composes a batch, sends it once and demultiplexes the response.
pub struct BatchExecutor<T, P = IndexedNamespace> {
    transport: T,
    composer: Composer<P>,
}

impl<T: Transport> BatchExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self::with_composer(transport, Composer::new(BatchConfig::default()))
    }

    pub fn with_config(transport: T, config: BatchConfig) -> Self {
        Self::with_composer(transport, Composer::new(config))
    }
}

impl<T: Transport, P: NamespacePolicy> BatchExecutor<T, P> {
    pub fn with_composer(transport: T, composer: Composer<P>) -> Self {
        Self {
            transport,
            composer,
        }
    }

    pub fn composer(&self) -> &Composer<P> {
        &self.composer
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs `template` once per item in a single round trip.
    ///
    /// Structural problems fail before anything is sent. A transport failure
    /// fails the whole batch; nothing is resent. Per-item failures are part
    /// of the returned result.
    pub async fn execute<K>(
        &self,
        template: &OperationDefinition,
        items: &[BatchItem<K>],
    ) -> ComposeResult<ComposedResult<K>>
    where
        K: Eq + Hash + Clone,
    {
        let composed = self.composer.compose(template, items)?;
        let request = composed.to_request();

        debug!(
            items = items.len(),
            query_len = request.query.len(),
            "sending composed batch"
        );

        let response = self.transport.execute(request).await.map_err(|err| {
            warn!(error = %err, retryable = err.retryable, "batch transport failed");
            err
        })?;

        Ok(self.composer.demux(&composed, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposeError;
    use crate::parse_operation;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recording {
        sent: Mutex<Vec<GraphQLRequest>>,
        reply: Result<GraphQLResponse, TransportError>,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn execute(
            &self,
            request: GraphQLRequest,
        ) -> Result<GraphQLResponse, TransportError> {
            self.sent.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn template() -> OperationDefinition {
        parse_operation("query($id: ID!) { node(id: $id) { id } }", None).unwrap()
    }

    #[tokio::test]
    async fn test_single_round_trip() {
        let transport = Arc::new(Recording {
            sent: Mutex::new(Vec::new()),
            reply: Ok(GraphQLResponse::new(json!({
                "alias0": {"id": "1"},
                "alias1": {"id": "2"},
            }))),
        });
        let executor = BatchExecutor::new(transport.clone());
        let items = [
            BatchItem::new(1).with_variable("id", "1"),
            BatchItem::new(2).with_variable("id", "2"),
        ];

        let result = executor.execute(&template(), &items).await.unwrap();

        assert!(result.is_complete_success());
        assert_eq!(result.get(&2).unwrap().data(), Some(&json!({"id": "2"})));
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].variables.len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_sent_for_invalid_batch() {
        let transport = Arc::new(Recording {
            sent: Mutex::new(Vec::new()),
            reply: Ok(GraphQLResponse::default()),
        });
        let executor = BatchExecutor::new(transport.clone());

        let err = executor.execute::<u32>(&template(), &[]).await.unwrap_err();
        assert!(matches!(err, ComposeError::EmptyBatch));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let executor = BatchExecutor::new(Recording {
            sent: Mutex::new(Vec::new()),
            reply: Err(TransportError::retryable("connection reset")),
        });
        let items = [BatchItem::new("a").with_variable("id", "1")];

        let err = executor.execute(&template(), &items).await.unwrap_err();
        assert!(matches!(err, ComposeError::Transport(_)));
        assert!(err.is_retryable());
    }
}
