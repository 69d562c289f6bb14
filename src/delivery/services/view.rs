//! In-process snapshot of recent delivery requests.

use crate::delivery::{
    domain::{DeliveryRequest, DeliveryRequestId},
    ports::DeliveryFilter,
};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Keyed snapshot serving synchronous reads.
///
/// Writes only ever come from records the gateway has confirmed, so an
/// entry never runs ahead of storage. The snapshot holds at most `window`
/// requests; the oldest by `(created_at, id)` are evicted first.
#[derive(Debug)]
pub(crate) struct MaterializedView {
    requests: HashMap<DeliveryRequestId, DeliveryRequest>,
    window: usize,
}

impl MaterializedView {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            requests: HashMap::new(),
            window,
        }
    }

    /// Replaces the whole snapshot.
    pub(crate) fn replace_all(&mut self, rows: Vec<DeliveryRequest>) {
        self.requests = rows.into_iter().map(|row| (row.id(), row)).collect();
        self.evict_overflow();
    }

    /// Stores a confirmed record unless the view already holds a newer one.
    pub(crate) fn upsert(&mut self, request: DeliveryRequest) {
        match self.requests.get(&request.id()) {
            Some(existing) if existing.revision() > request.revision() => {}
            _ => {
                self.requests.insert(request.id(), request);
                self.evict_overflow();
            }
        }
    }

    pub(crate) fn get(&self, id: DeliveryRequestId) -> Option<&DeliveryRequest> {
        self.requests.get(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    fn evict_overflow(&mut self) {
        while self.requests.len() > self.window {
            let oldest = self
                .requests
                .values()
                .min_by_key(|request| (request.created_at(), request.id()))
                .map(DeliveryRequest::id);
            let Some(id) = oldest else {
                break;
            };
            self.requests.remove(&id);
        }
    }

    /// Returns up to `limit` matching requests, newest first.
    pub(crate) fn query(&self, filter: &DeliveryFilter, limit: usize) -> Vec<DeliveryRequest> {
        let mut matching: Vec<&DeliveryRequest> = self
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .collect();
        matching.sort_by_key(|request| Reverse((request.created_at(), request.id())));
        matching.into_iter().take(limit).cloned().collect()
    }
}
