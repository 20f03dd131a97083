use std::collections::VecDeque;

use crate::authority::{ActionRequest, ParticipantId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRequest {
    pub from: ParticipantId,
    pub request: ActionRequest,
    pub received_at: f64,
}

/// Observer requests waiting for the host's next step.
pub struct RequestBuffer {
    requests: VecDeque<PendingRequest>,
    max_size: usize,
}

impl RequestBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            requests: VecDeque::with_capacity(max_size),
            max_size: max_size.max(1),
        }
    }

    pub fn push(&mut self, from: ParticipantId, request: ActionRequest, received_at: f64) {
        if self.requests.len() >= self.max_size {
            if let Some(dropped) = self.requests.pop_front() {
                log::warn!(
                    "request buffer full, dropping {:?} from participant {}",
                    dropped.request,
                    dropped.from.0
                );
            }
        }
        self.requests.push_back(PendingRequest {
            from,
            request,
            received_at,
        });
    }

    pub fn drain(&mut self) -> Vec<PendingRequest> {
        self.requests.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
