//! Request descriptor carried through the pipeline.

use std::sync::Arc;

use super::ApiRequest;
use crate::id::RequestId;

/// An outbound call together with its retry bookkeeping.
///
/// Descriptors are values: marking one as retried or recording the bearer
/// it was sent with produces a new descriptor, so a reused descriptor can
/// never alias another call's retry state.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    id: RequestId,
    request: Arc<ApiRequest>,
    retried: bool,
    bearer: Option<String>,
}

impl RequestDescriptor {
    /// Wraps a request that has not been sent yet.
    #[must_use]
    pub fn new(request: ApiRequest) -> Self {
        Self {
            id: RequestId::generate(),
            request: Arc::new(request),
            retried: false,
            bearer: None,
        }
    }

    /// Correlation id, stable across the retry.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The original request.
    #[must_use]
    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    /// Whether this descriptor already went through a refresh-and-retry cycle.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// The access token this descriptor was last sent with.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    /// Returns a copy that records the bearer token used for dispatch.
    #[must_use]
    pub fn sent_with(&self, bearer: Option<String>) -> Self {
        Self {
            bearer,
            ..self.clone()
        }
    }

    /// Returns the descriptor for the single permitted retry.
    #[must_use]
    pub fn into_retried(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}
