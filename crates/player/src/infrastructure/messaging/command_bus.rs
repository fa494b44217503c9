//! Outbound side of the channel: request framing and one-shot response
//! correlation.
//!
//! Every request may carry a callback that fires once, on the matching
//! response. How a response is matched is a [`CorrelationPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use battlemap_shared::{ClientRequest, Envelope, ResponseResult};

/// One-shot response handler. Receives the decoded response and the session
/// context it runs in.
pub type ResponseCallback<C> = Box<dyn FnOnce(ResponseResult, &mut C) + Send + 'static>;

/// How responses are matched to pending callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorrelationPolicy {
    /// A fresh token per request, echoed back as `requestId`
    #[default]
    PerRequest,
    /// At most one callback per action name; a newer request replaces the
    /// older callback and the next response with that name resolves it
    PerAction,
}

impl CorrelationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            CorrelationPolicy::PerRequest => "per-request",
            CorrelationPolicy::PerAction => "per-action",
        }
    }
}

impl fmt::Display for CorrelationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrelationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-request" | "request" => Ok(CorrelationPolicy::PerRequest),
            "per-action" | "action" => Ok(CorrelationPolicy::PerAction),
            other => Err(format!(
                "expected 'per-request' or 'per-action', got '{other}'"
            )),
        }
    }
}

/// Build the frame for a request.
pub fn request_frame(request: &ClientRequest, request_id: Option<String>) -> Envelope {
    let frame = Envelope::new(request.action(), request.params());
    match request_id {
        Some(id) => frame.with_request_id(id),
        None => frame,
    }
}

struct Pending<C> {
    action: String,
    seq: u64,
    callback: ResponseCallback<C>,
}

/// Pending request tracker for request-response correlation.
///
/// Under [`CorrelationPolicy::PerRequest`] entries are keyed by token. A
/// response-shaped frame that arrives without a token falls back to the oldest
/// pending request for the same action, so servers that do not echo tokens
/// still resolve in order. Under [`CorrelationPolicy::PerAction`] entries are keyed
/// by action name.
pub struct PendingRequests<C> {
    policy: CorrelationPolicy,
    inner: HashMap<String, Pending<C>>,
    next_seq: u64,
}

impl<C> PendingRequests<C> {
    pub fn new(policy: CorrelationPolicy) -> Self {
        Self {
            policy,
            inner: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn policy(&self) -> CorrelationPolicy {
        self.policy
    }

    /// Register a callback for `action`.
    ///
    /// Returns the token to put on the outbound frame, if the policy uses one.
    pub fn insert(&mut self, action: &str, callback: ResponseCallback<C>) -> Option<String> {
        let seq = self.next_seq;
        self.next_seq += 1;
        let pending = Pending {
            action: action.to_string(),
            seq,
            callback,
        };
        match self.policy {
            CorrelationPolicy::PerRequest => {
                let id = uuid::Uuid::new_v4().to_string();
                self.inner.insert(id.clone(), pending);
                Some(id)
            }
            CorrelationPolicy::PerAction => {
                if self.inner.insert(action.to_string(), pending).is_some() {
                    tracing::debug!(
                        action = %action,
                        "Replaced pending callback for action with a newer request"
                    );
                }
                None
            }
        }
    }

    /// A token for a request that has no callback.
    pub fn fire_and_forget_token(&self) -> Option<String> {
        match self.policy {
            CorrelationPolicy::PerRequest => Some(uuid::Uuid::new_v4().to_string()),
            CorrelationPolicy::PerAction => None,
        }
    }

    /// Remove and return the callback an inbound frame resolves, if any.
    pub fn take_for(&mut self, frame: &Envelope) -> Option<ResponseCallback<C>> {
        let key = match (self.policy, frame.request_id.as_deref()) {
            // Push bodies share names with actions (createNPCs, reset); only
            // response-shaped payloads may resolve a callback.
            (CorrelationPolicy::PerAction, _) => ResponseResult::is_response_shaped(&frame.data)
                .then(|| frame.event.clone()),
            (CorrelationPolicy::PerRequest, Some(id)) => {
                if !self.inner.contains_key(id) {
                    tracing::debug!(
                        request_id = %id,
                        event = %frame.event,
                        "Response received for unknown request ID"
                    );
                    return None;
                }
                Some(id.to_string())
            }
            (CorrelationPolicy::PerRequest, None) => {
                if !ResponseResult::is_response_shaped(&frame.data) {
                    return None;
                }
                self.oldest_for(&frame.event)
            }
        }?;
        self.inner.remove(&key).map(|p| p.callback)
    }

    fn oldest_for(&self, action: &str) -> Option<String> {
        self.inner
            .iter()
            .filter(|(_, p)| p.action == action)
            .min_by_key(|(_, p)| p.seq)
            .map(|(key, _)| key.clone())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }

    pub fn clear(&mut self) -> usize {
        let count = self.inner.len();
        self.inner.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
