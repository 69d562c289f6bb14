//! Shared helpers for in-memory delivery integration tests.

use std::sync::Arc;

use card_delivery::delivery::{
    adapters::memory::InMemoryDeliveryGateway,
    domain::{
        Actor, AddressInput, CardId, DeliveryRequest, DeliveryRequestId, DeliveryState,
        ResidentId, StatusHistoryEntry, TransitionCommand, Trigger,
    },
    services::{CreateDeliveryRequest, DeliveryConfig, DeliveryRequestRepository},
};
use eyre::WrapErr;
use mockable::DefaultClock;

/// Repository type used by the integration suites.
pub type TestRepository = DeliveryRequestRepository<InMemoryDeliveryGateway, DefaultClock>;

/// Builds an empty, loaded repository over a fresh in-memory gateway.
pub async fn empty_repository(config: DeliveryConfig) -> eyre::Result<TestRepository> {
    let repository = DeliveryRequestRepository::with_config(
        Arc::new(InMemoryDeliveryGateway::new()),
        Arc::new(DefaultClock),
        config,
    );
    repository
        .refresh()
        .await
        .wrap_err("load an empty delivery view")?;
    Ok(repository)
}

/// A back-office operator.
pub fn operator() -> eyre::Result<Actor> {
    Actor::staff("ops-12", "Rina Halim").wrap_err("build staff actor")
}

/// A complete courier address in central Jakarta.
pub fn jakarta_address() -> AddressInput {
    AddressInput::new("31", "3171", "3171030", "Jl. Cikini Raya 73").with_postal_code("10330")
}

/// Opens a courier request for `owner`.
pub async fn open_courier_request(
    repository: &TestRepository,
    owner: ResidentId,
) -> eyre::Result<DeliveryRequest> {
    let request =
        CreateDeliveryRequest::courier(CardId::new(), owner, "JKT-PUSAT", jakarta_address());
    repository
        .create(request, Actor::resident(owner))
        .await
        .wrap_err("create courier delivery request")
}

/// Applies `trigger` as `actor` and returns the stored request.
pub async fn fire(
    repository: &TestRepository,
    id: DeliveryRequestId,
    trigger: Trigger,
    actor: Actor,
) -> eyre::Result<DeliveryRequest> {
    let kind = trigger.kind();
    let outcome = repository
        .apply_transition(id, TransitionCommand::new(trigger, actor))
        .await
        .wrap_err_with(|| format!("apply {kind}"))?;
    Ok(outcome.into_request())
}

/// Walks a fresh request through print and dispatch as staff.
pub async fn dispatch(
    repository: &TestRepository,
    id: DeliveryRequestId,
) -> eyre::Result<DeliveryRequest> {
    fire(repository, id, Trigger::SendToPrint { batch_id: None }, operator()?).await?;
    fire(repository, id, Trigger::MarkPrinted, operator()?).await?;
    fire(repository, id, Trigger::Dispatch, operator()?).await
}

/// Projects history entries onto their `(from, to)` edges.
pub fn edges(
    entries: &[StatusHistoryEntry],
) -> Vec<(Option<DeliveryState>, DeliveryState)> {
    entries
        .iter()
        .map(|entry| (entry.previous_state(), entry.new_state()))
        .collect()
}
