//! Delivery request repository: materialized view plus lifecycle writes.

use super::{
    AuditRecorder, DeliveryConfig,
    error::{DeliveryServiceError, DeliveryServiceResult, StorageFailure, bounded},
    view::MaterializedView,
};
use crate::delivery::{
    domain::{
        Actor, Address, AddressInput, CardId, DeliveryPreferences, DeliveryRequest,
        DeliveryRequestDraft, DeliveryRequestId, DeliveryState, DeliveryStateMachine,
        DeliveryType, DeliveryValidationError, Destination, FileRef, Planned, ResidentId,
        ServiceAreaCode, StatusHistoryEntry, TransitionCommand,
    },
    ports::{
        ConditionalUpdate, DeliveryFilter, DeliveryGateway, DeliveryGatewayError,
        DeliveryGatewayResult, DeliveryQuery, PageCursor,
    },
};
use mockable::Clock;
use std::sync::{
    Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicBool, Ordering},
};

/// Request payload for opening a delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeliveryRequest {
    card_id: CardId,
    owner_id: ResidentId,
    service_area_code: String,
    delivery_type: DeliveryType,
    address: Option<AddressInput>,
    preferences: DeliveryPreferences,
    photo: Option<String>,
}

impl CreateDeliveryRequest {
    /// Creates a request with required fields and no address.
    #[must_use]
    pub fn new(
        card_id: CardId,
        owner_id: ResidentId,
        service_area_code: impl Into<String>,
        delivery_type: DeliveryType,
    ) -> Self {
        Self {
            card_id,
            owner_id,
            service_area_code: service_area_code.into(),
            delivery_type,
            address: None,
            preferences: DeliveryPreferences::default(),
            photo: None,
        }
    }

    /// Creates a courier delivery request to `address`.
    #[must_use]
    pub fn courier(
        card_id: CardId,
        owner_id: ResidentId,
        service_area_code: impl Into<String>,
        address: AddressInput,
    ) -> Self {
        Self::new(card_id, owner_id, service_area_code, DeliveryType::Delivery)
            .with_address(address)
    }

    /// Creates an office pickup request.
    #[must_use]
    pub fn pickup(
        card_id: CardId,
        owner_id: ResidentId,
        service_area_code: impl Into<String>,
    ) -> Self {
        Self::new(card_id, owner_id, service_area_code, DeliveryType::Pickup)
    }

    /// Sets the destination address; ignored for pickup requests.
    #[must_use]
    pub fn with_address(mut self, address: AddressInput) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets scheduling preferences.
    #[must_use]
    pub fn with_preferences(mut self, preferences: DeliveryPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Sets a replacement photo reference.
    #[must_use]
    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }

    fn into_draft(self) -> Result<DeliveryRequestDraft, DeliveryValidationError> {
        let service_area_code = ServiceAreaCode::new(self.service_area_code)?;
        let destination = match self.delivery_type {
            DeliveryType::Delivery => {
                let input = self.address.ok_or(DeliveryValidationError::MissingAddress)?;
                Destination::Delivery {
                    address: Address::new(input)?,
                }
            }
            DeliveryType::Pickup => Destination::Pickup,
        };
        let updated_photo = self
            .photo
            .map(|photo| FileRef::new(photo, "photo"))
            .transpose()?;
        Ok(DeliveryRequestDraft {
            card_id: self.card_id,
            owner_id: self.owner_id,
            service_area_code,
            destination,
            preferences: self.preferences,
            updated_photo,
        })
    }
}

/// Result of a successful [`DeliveryRequestRepository::apply_transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The change was persisted; carries the stored record.
    Applied(DeliveryRequest),
    /// Receipt had already been confirmed; nothing was written.
    AlreadyConfirmed(DeliveryRequest),
}

impl TransitionOutcome {
    /// Returns the current record.
    #[must_use]
    pub const fn request(&self) -> &DeliveryRequest {
        match self {
            Self::Applied(request) | Self::AlreadyConfirmed(request) => request,
        }
    }

    /// Consumes the outcome, returning the current record.
    #[must_use]
    pub fn into_request(self) -> DeliveryRequest {
        match self {
            Self::Applied(request) | Self::AlreadyConfirmed(request) => request,
        }
    }

    /// Returns whether a write happened.
    #[must_use]
    pub const fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Materialized view over the delivery gateway.
///
/// Reads are synchronous and served from the view. Writes go to the
/// gateway first; the view only ever reflects what the gateway confirmed,
/// so a failed or timed-out write leaves it untouched.
pub struct DeliveryRequestRepository<G, C>
where
    G: DeliveryGateway,
    C: Clock + Send + Sync,
{
    gateway: Arc<G>,
    clock: Arc<C>,
    config: DeliveryConfig,
    engine: DeliveryStateMachine,
    recorder: AuditRecorder<G, C>,
    view: RwLock<MaterializedView>,
    loaded: AtomicBool,
}

impl<G, C> DeliveryRequestRepository<G, C>
where
    G: DeliveryGateway,
    C: Clock + Send + Sync,
{
    /// Creates a repository with default configuration.
    #[must_use]
    pub fn new(gateway: Arc<G>, clock: Arc<C>) -> Self {
        Self::with_config(gateway, clock, DeliveryConfig::default())
    }

    /// Creates a repository with explicit configuration.
    #[must_use]
    pub fn with_config(gateway: Arc<G>, clock: Arc<C>, config: DeliveryConfig) -> Self {
        let recorder = AuditRecorder::new(
            Arc::clone(&gateway),
            Arc::clone(&clock),
            config.gateway_timeout,
        );
        let view = RwLock::new(MaterializedView::new(config.view_window));
        Self {
            engine: DeliveryStateMachine::new(config.escalation),
            gateway,
            clock,
            config,
            recorder,
            view,
            loaded: AtomicBool::new(false),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Returns the audit recorder sharing this repository's gateway.
    #[must_use]
    pub const fn recorder(&self) -> &AuditRecorder<G, C> {
        &self.recorder
    }

    /// Returns whether at least one refresh has completed, successfully or
    /// not.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Reloads the view with the newest `view_window` requests.
    ///
    /// The loaded flag is set even when the reload fails so readers never
    /// wait on a broken store.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::TransientStorage`] when the select
    /// fails or times out; the previous view is kept.
    pub async fn refresh(&self) -> DeliveryServiceResult<usize> {
        let query = DeliveryQuery::newest(DeliveryFilter::All, self.config.view_window);
        let result = self.call("select", self.gateway.select(&query)).await;
        self.loaded.store(true, Ordering::Release);
        let rows = result.map_err(|failure| DeliveryServiceError::storage("refresh", failure))?;

        let mut view = self.write_view();
        view.replace_all(rows);
        let count = view.len();
        drop(view);
        tracing::debug!(count, "delivery view refreshed");
        Ok(count)
    }

    /// Opens a new request in state `requested` and records its creation.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::Validation`] for incomplete input and
    /// [`DeliveryServiceError::TransientStorage`] when the insert fails.
    pub async fn create(
        &self,
        request: CreateDeliveryRequest,
        actor: Actor,
    ) -> DeliveryServiceResult<DeliveryRequest> {
        let draft = request.into_draft()?;
        let delivery = DeliveryRequest::new(draft, &*self.clock);
        let created = StatusHistoryEntry::record(
            delivery.id(),
            None,
            DeliveryState::Requested,
            actor,
            Some(format!("{} requested", delivery.delivery_type())),
            delivery.created_at(),
        );

        let stored = self
            .call("insert", self.gateway.insert(&delivery, &created))
            .await
            .map_err(|failure| DeliveryServiceError::storage("insert", failure))?;
        self.write_view().upsert(stored.clone());
        tracing::info!(
            request_id = %stored.id(),
            owner_id = %stored.owner_id(),
            service_area = %stored.service_area_code(),
            delivery_type = %stored.delivery_type(),
            "delivery request created"
        );
        Ok(stored)
    }

    /// Returns a request from the view.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::NotFound`] when the view does not
    /// hold the request.
    pub fn get_by_id(&self, id: DeliveryRequestId) -> DeliveryServiceResult<DeliveryRequest> {
        self.read_view()
            .get(id)
            .cloned()
            .ok_or(DeliveryServiceError::NotFound(id))
    }

    /// Lists a resident's requests, newest first, capped at `page_size`.
    #[must_use]
    pub fn list_by_owner(&self, owner_id: ResidentId) -> Vec<DeliveryRequest> {
        self.list(&DeliveryFilter::Owner(owner_id))
    }

    /// Lists a service area's requests, newest first, capped at
    /// `page_size`.
    #[must_use]
    pub fn list_by_service_area(&self, code: &ServiceAreaCode) -> Vec<DeliveryRequest> {
        self.list(&DeliveryFilter::ServiceArea(code.clone()))
    }

    /// Lists requests in a state, newest first, capped at `page_size`.
    #[must_use]
    pub fn list_by_state(&self, state: DeliveryState) -> Vec<DeliveryRequest> {
        self.list(&DeliveryFilter::State(state))
    }

    /// Reads one page straight from storage, for history beyond the view.
    ///
    /// Pass [`PageCursor::at`] the last row of the previous page as
    /// `after` to continue.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::TransientStorage`] when the select
    /// fails or times out.
    pub async fn list_page(
        &self,
        filter: DeliveryFilter,
        after: Option<PageCursor>,
    ) -> DeliveryServiceResult<Vec<DeliveryRequest>> {
        let query = DeliveryQuery::newest(filter, self.config.page_size).after(after);
        self.call("select", self.gateway.select(&query))
            .await
            .map_err(|failure| DeliveryServiceError::storage("list_page", failure))
    }

    /// Returns a request's history in ascending time order.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::TransientStorage`] when the read
    /// fails or times out.
    pub async fn history(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryServiceResult<Vec<StatusHistoryEntry>> {
        self.recorder.history(id).await
    }

    /// Validates and persists one lifecycle transition.
    ///
    /// The row update and its audit entry are written in one gateway call,
    /// conditional on the revision and state that were planned against.
    /// When another writer got there first the request is re-read and
    /// re-planned, up to `max_conflict_retries` times. Requests older than
    /// the view window are read from storage.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::NotFound`] when the request is
    /// unknown, [`DeliveryServiceError::Validation`] or
    /// [`DeliveryServiceError::InvalidTransition`] when the engine rejects
    /// the command, [`DeliveryServiceError::Conflict`] when retries run
    /// out, and [`DeliveryServiceError::TransientStorage`] when storage
    /// fails.
    pub async fn apply_transition(
        &self,
        id: DeliveryRequestId,
        command: TransitionCommand,
    ) -> DeliveryServiceResult<TransitionOutcome> {
        let mut current = self.lookup(id).await?;
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let plan = match self.engine.plan(&current, &command, self.clock.utc())? {
                Planned::AlreadyConfirmed => {
                    tracing::info!(request_id = %id, "delivery already confirmed");
                    return Ok(TransitionOutcome::AlreadyConfirmed(current));
                }
                Planned::Transition(plan) => *plan,
            };

            let update = ConditionalUpdate {
                request_id: id,
                expected_revision: current.revision(),
                expected_state: plan.from,
                patch: plan.patch,
                audit: plan.audit,
            };
            match self.call("update", self.gateway.update(&update)).await {
                Ok(stored) => {
                    self.write_view().upsert(stored.clone());
                    tracing::info!(
                        request_id = %id,
                        trigger = %plan.trigger,
                        from = %plan.from,
                        to = %plan.to,
                        actor = %command.actor,
                        "delivery transition applied"
                    );
                    return Ok(TransitionOutcome::Applied(stored));
                }
                Err(StorageFailure::Gateway(DeliveryGatewayError::Conflict { .. }))
                    if attempts <= self.config.max_conflict_retries =>
                {
                    tracing::warn!(
                        request_id = %id,
                        trigger = %plan.trigger,
                        attempt = attempts,
                        "delivery request changed concurrently; re-reading"
                    );
                    current = self.reload(id).await?;
                }
                Err(StorageFailure::Gateway(DeliveryGatewayError::Conflict { .. })) => {
                    tracing::warn!(
                        request_id = %id,
                        attempts,
                        "giving up on contended delivery request"
                    );
                    return Err(DeliveryServiceError::Conflict {
                        request_id: id,
                        attempts,
                    });
                }
                Err(failure) => return Err(DeliveryServiceError::storage("update", failure)),
            }
        }
    }

    pub(crate) const fn engine(&self) -> &DeliveryStateMachine {
        &self.engine
    }

    pub(crate) const fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub(crate) const fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    pub(crate) fn read_view(&self) -> RwLockReadGuard<'_, MaterializedView> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_view(&self) -> RwLockWriteGuard<'_, MaterializedView> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) async fn call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = DeliveryGatewayResult<T>>,
    ) -> Result<T, StorageFailure> {
        bounded(self.config.gateway_timeout, operation, call).await
    }

    fn list(&self, filter: &DeliveryFilter) -> Vec<DeliveryRequest> {
        self.read_view().query(filter, self.config.page_size)
    }

    /// Reads one request straight from storage without touching the view.
    pub(crate) async fn fetch(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryServiceResult<Option<DeliveryRequest>> {
        self.call("find_by_id", self.gateway.find_by_id(id))
            .await
            .map_err(|failure| DeliveryServiceError::storage("find_by_id", failure))
    }

    /// Returns the view's copy, or the stored row when the request has
    /// aged out of the view window.
    async fn lookup(&self, id: DeliveryRequestId) -> DeliveryServiceResult<DeliveryRequest> {
        let cached = self.read_view().get(id).cloned();
        if let Some(request) = cached {
            return Ok(request);
        }
        tracing::debug!(request_id = %id, "delivery request not in view; reading storage");
        self.reload(id).await
    }

    async fn reload(&self, id: DeliveryRequestId) -> DeliveryServiceResult<DeliveryRequest> {
        let fresh = self
            .fetch(id)
            .await?
            .ok_or(DeliveryServiceError::NotFound(id))?;
        self.write_view().upsert(fresh.clone());
        Ok(fresh)
    }
}
