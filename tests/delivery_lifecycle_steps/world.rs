//! Shared world state for delivery lifecycle BDD scenarios.

use std::sync::Arc;

use card_delivery::delivery::{
    adapters::memory::InMemoryDeliveryGateway,
    domain::{Actor, DeliveryRequest, ResidentId, TransitionCommand, Trigger},
    services::{DeliveryRequestRepository, DeliveryServiceError},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Repository type used by the BDD world.
pub type TestRepository = DeliveryRequestRepository<InMemoryDeliveryGateway, DefaultClock>;

/// Scenario world for delivery lifecycle behaviour tests.
pub struct DeliveryWorld {
    pub repository: TestRepository,
    pub owner: ResidentId,
    pub request: Option<DeliveryRequest>,
    pub last_result: Option<Result<DeliveryRequest, DeliveryServiceError>>,
}

impl DeliveryWorld {
    /// Creates a world with a fresh in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            repository: DeliveryRequestRepository::new(
                Arc::new(InMemoryDeliveryGateway::new()),
                Arc::new(DefaultClock),
            ),
            owner: ResidentId::new(),
            request: None,
            last_result: None,
        }
    }

    /// Returns the scenario's request or fails the step.
    pub fn current(&self) -> Result<&DeliveryRequest, eyre::Report> {
        self.request
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing delivery request in scenario world"))
    }

    /// Applies a trigger to the scenario's request and records the result.
    pub fn fire(&mut self, trigger: Trigger, actor: Actor) -> Result<(), eyre::Report> {
        let id = self.current()?.id();
        let result = run_async(
            self.repository
                .apply_transition(id, TransitionCommand::new(trigger, actor)),
        )
        .map(|outcome| outcome.into_request());
        if let Ok(ref updated) = result {
            self.request = Some(updated.clone());
        }
        self.last_result = Some(result);
        Ok(())
    }
}

impl Default for DeliveryWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DeliveryWorld {
    DeliveryWorld::default()
}

/// A back-office operator.
pub fn operator() -> Result<Actor, eyre::Report> {
    Actor::staff("ops-3", "Bayu Pratama").map_err(|err| eyre::eyre!("invalid staff actor: {err}"))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
