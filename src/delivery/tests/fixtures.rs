//! Shared builders and test doubles for delivery unit tests.

use crate::delivery::{
    adapters::memory::InMemoryDeliveryGateway,
    domain::{
        Actor, Address, AddressInput, CardId, DeliveryPreferences, DeliveryRequest,
        DeliveryRequestId, DeliveryState, Destination, FailureReason, Milestones,
        PersistedDeliveryData, ResidentId, Revision, ServiceAreaCode, StatusHistoryEntry,
    },
    ports::{
        BulkItemOutcome, ConditionalUpdate, DeliveryGateway, DeliveryGatewayResult,
        DeliveryQuery,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use mockall::mock;
use std::time::Duration as StdDuration;

mock! {
    pub Gateway {}

    #[async_trait]
    impl DeliveryGateway for Gateway {
        async fn insert(
            &self,
            request: &DeliveryRequest,
            created: &StatusHistoryEntry,
        ) -> DeliveryGatewayResult<DeliveryRequest>;
        async fn find_by_id(
            &self,
            id: DeliveryRequestId,
        ) -> DeliveryGatewayResult<Option<DeliveryRequest>>;
        async fn update(&self, update: &ConditionalUpdate) -> DeliveryGatewayResult<DeliveryRequest>;
        async fn update_many(
            &self,
            updates: &[ConditionalUpdate],
        ) -> DeliveryGatewayResult<Vec<BulkItemOutcome>>;
        async fn select(&self, query: &DeliveryQuery) -> DeliveryGatewayResult<Vec<DeliveryRequest>>;
        async fn append_history(&self, entry: &StatusHistoryEntry) -> DeliveryGatewayResult<()>;
        async fn history(
            &self,
            id: DeliveryRequestId,
        ) -> DeliveryGatewayResult<Vec<StatusHistoryEntry>>;
    }
}

/// Fixed instant `minutes` after the test epoch.
pub(super) fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0)
        .single()
        .expect("valid test epoch")
        + Duration::minutes(minutes)
}

pub(super) fn staff() -> Actor {
    Actor::staff("staff-7", "Dewi Lestari").expect("valid staff actor")
}

pub(super) fn address_input() -> AddressInput {
    AddressInput::new("31", "3171", "3171010", "Jl. Kebon Sirih 12")
        .with_postal_code("10340")
        .with_landmark("blue gate")
}

pub(super) fn area() -> ServiceAreaCode {
    ServiceAreaCode::new("JKT-PUSAT").expect("valid service area")
}

/// Persisted shape of a courier request sitting in `state`.
pub(super) fn seed(state: DeliveryState) -> PersistedDeliveryData {
    let created_at = at(0);
    let mut milestones = Milestones::default();
    if state != DeliveryState::Requested {
        milestones.sent_to_print_at = Some(at(1));
    }
    if !matches!(state, DeliveryState::Requested | DeliveryState::Printing) {
        milestones.printed_at = Some(at(2));
    }
    if !matches!(
        state,
        DeliveryState::Requested | DeliveryState::Printing | DeliveryState::Printed
    ) {
        milestones.out_for_delivery_at = Some(at(3));
    }
    if state == DeliveryState::Delivered {
        milestones.delivered_at = Some(at(4));
    }
    let (failure_reason, failed_attempts) = match state {
        DeliveryState::DeliveryFailed => (Some(FailureReason::NotHome), 1),
        DeliveryState::PickupRequired => (Some(FailureReason::NotHome), 2),
        _ => (None, 0),
    };

    PersistedDeliveryData {
        id: DeliveryRequestId::new(),
        card_id: CardId::new(),
        owner_id: ResidentId::new(),
        service_area_code: area(),
        destination: Destination::Delivery {
            address: Address::new(address_input()).expect("valid address"),
        },
        preferences: DeliveryPreferences::default(),
        state,
        failure_reason,
        failed_attempts,
        updated_photo: None,
        confirmation: None,
        assigned_staff: None,
        print_batch_id: None,
        milestones,
        revision: Revision::new(3),
        created_at,
        updated_at: created_at,
    }
}

pub(super) fn request_in(state: DeliveryState) -> DeliveryRequest {
    DeliveryRequest::from_persisted(seed(state))
}

pub(super) fn failed_with(reason: FailureReason, attempts: u32) -> DeliveryRequest {
    let mut data = seed(DeliveryState::DeliveryFailed);
    data.failure_reason = Some(reason);
    data.failed_attempts = attempts;
    DeliveryRequest::from_persisted(data)
}

pub(super) fn out_for_delivery_after(attempts: u32) -> DeliveryRequest {
    let mut data = seed(DeliveryState::OutForDelivery);
    data.failed_attempts = attempts;
    DeliveryRequest::from_persisted(data)
}

pub(super) fn pickup_in(state: DeliveryState) -> DeliveryRequest {
    let mut data = seed(state);
    data.destination = Destination::Pickup;
    DeliveryRequest::from_persisted(data)
}

/// A request created `minutes` after the epoch, for ordering tests.
pub(super) fn created_at_minute(
    owner_id: ResidentId,
    state: DeliveryState,
    minutes: i64,
) -> DeliveryRequest {
    let mut data = seed(state);
    data.owner_id = owner_id;
    data.created_at = at(minutes);
    data.updated_at = at(minutes);
    DeliveryRequest::from_persisted(data)
}

/// Clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub(super) struct FrozenClock(pub(super) DateTime<Utc>);

impl Clock for FrozenClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Stores a request directly in the gateway, bypassing the repository.
pub(super) async fn seed_into(gateway: &InMemoryDeliveryGateway, request: &DeliveryRequest) {
    let created = StatusHistoryEntry::record(
        request.id(),
        None,
        request.state(),
        staff(),
        None,
        request.created_at(),
    );
    gateway
        .insert(request, &created)
        .await
        .expect("seeding the in-memory gateway should succeed");
}

/// Gateway whose writes never complete; reads pass through.
#[derive(Debug, Clone, Default)]
pub(super) struct StallingGateway {
    pub(super) inner: InMemoryDeliveryGateway,
}

impl StallingGateway {
    async fn stall() {
        tokio::time::sleep(StdDuration::from_secs(3600)).await;
    }
}

#[async_trait]
impl DeliveryGateway for StallingGateway {
    async fn insert(
        &self,
        request: &DeliveryRequest,
        created: &StatusHistoryEntry,
    ) -> DeliveryGatewayResult<DeliveryRequest> {
        Self::stall().await;
        self.inner.insert(request, created).await
    }

    async fn find_by_id(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryGatewayResult<Option<DeliveryRequest>> {
        self.inner.find_by_id(id).await
    }

    async fn update(&self, update: &ConditionalUpdate) -> DeliveryGatewayResult<DeliveryRequest> {
        Self::stall().await;
        self.inner.update(update).await
    }

    async fn update_many(
        &self,
        updates: &[ConditionalUpdate],
    ) -> DeliveryGatewayResult<Vec<BulkItemOutcome>> {
        Self::stall().await;
        self.inner.update_many(updates).await
    }

    async fn select(&self, query: &DeliveryQuery) -> DeliveryGatewayResult<Vec<DeliveryRequest>> {
        self.inner.select(query).await
    }

    async fn append_history(&self, entry: &StatusHistoryEntry) -> DeliveryGatewayResult<()> {
        self.inner.append_history(entry).await
    }

    async fn history(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryGatewayResult<Vec<StatusHistoryEntry>> {
        self.inner.history(id).await
    }
}
