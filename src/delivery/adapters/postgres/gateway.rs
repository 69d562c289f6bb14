//! `PostgreSQL` gateway implementation for delivery storage.

use super::{
    models::{DeliveryChangeset, DeliveryRow, HistoryRow, NewDeliveryRow, NewHistoryRow},
    schema::{delivery_requests, delivery_status_history},
};
use crate::delivery::{
    domain::{
        Actor, CardId, DeliveryPatch, DeliveryRequest, DeliveryRequestId, DeliveryState,
        DeliveryType, Destination, FailureReason, FileRef, HistoryEntryId, Milestones,
        ParseDeliveryValueError, PersistedDeliveryData, PrintBatchId, ResidentId, Revision,
        ServiceAreaCode, StatusHistoryEntry,
    },
    ports::{
        BulkItemOutcome, ConditionalUpdate, DeliveryFilter, DeliveryGateway, DeliveryGatewayError,
        DeliveryGatewayResult, DeliveryQuery,
    },
};
use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by delivery adapters.
pub type DeliveryPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed delivery gateway.
#[derive(Debug, Clone)]
pub struct PostgresDeliveryGateway {
    pool: DeliveryPgPool,
}

impl PostgresDeliveryGateway {
    /// Creates a gateway from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DeliveryPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> DeliveryGatewayResult<T>
    where
        F: FnOnce(&mut PgConnection) -> DeliveryGatewayResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(DeliveryGatewayError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(DeliveryGatewayError::persistence)?
    }
}

impl From<DieselError> for DeliveryGatewayError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl DeliveryGateway for PostgresDeliveryGateway {
    async fn insert(
        &self,
        request: &DeliveryRequest,
        created: &StatusHistoryEntry,
    ) -> DeliveryGatewayResult<DeliveryRequest> {
        let request_id = request.id();
        let new_row = to_new_row(request)?;
        let history_row = to_history_row(created)?;

        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                let row = diesel::insert_into(delivery_requests::table)
                    .values(&new_row)
                    .returning(DeliveryRow::as_returning())
                    .get_result::<DeliveryRow>(conn)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            DeliveryGatewayError::DuplicateRequest(request_id)
                        }
                        _ => DeliveryGatewayError::persistence(err),
                    })?;
                diesel::insert_into(delivery_status_history::table)
                    .values(&history_row)
                    .execute(conn)?;
                row_to_request(row)
            })
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryGatewayResult<Option<DeliveryRequest>> {
        self.run_blocking(move |connection| {
            let row = delivery_requests::table
                .filter(delivery_requests::id.eq(id.into_inner()))
                .select(DeliveryRow::as_select())
                .first::<DeliveryRow>(connection)
                .optional()?;
            row.map(row_to_request).transpose()
        })
        .await
    }

    async fn update(&self, update: &ConditionalUpdate) -> DeliveryGatewayResult<DeliveryRequest> {
        let prepared = PreparedUpdate::new(update)?;
        self.run_blocking(move |connection| {
            connection.transaction(|conn| apply_conditional(conn, &prepared))
        })
        .await
    }

    async fn update_many(
        &self,
        updates: &[ConditionalUpdate],
    ) -> DeliveryGatewayResult<Vec<BulkItemOutcome>> {
        let prepared = updates
            .iter()
            .map(PreparedUpdate::new)
            .collect::<DeliveryGatewayResult<Vec<_>>>()?;
        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                prepared
                    .iter()
                    .map(|update| match apply_conditional(conn, update) {
                        Ok(stored) => Ok(BulkItemOutcome::Updated(Box::new(stored))),
                        Err(DeliveryGatewayError::Conflict { .. }) => {
                            Ok(BulkItemOutcome::Conflict)
                        }
                        Err(DeliveryGatewayError::NotFound(_)) => Ok(BulkItemOutcome::NotFound),
                        Err(err) => Err(err),
                    })
                    .collect::<DeliveryGatewayResult<Vec<_>>>()
            })
        })
        .await
    }

    async fn select(&self, query: &DeliveryQuery) -> DeliveryGatewayResult<Vec<DeliveryRequest>> {
        let owned = query.clone();
        self.run_blocking(move |connection| {
            let limit = i64::try_from(owned.limit).map_err(DeliveryGatewayError::persistence)?;
            let mut sql = delivery_requests::table
                .select(DeliveryRow::as_select())
                .into_boxed();
            sql = match &owned.filter {
                DeliveryFilter::All => sql,
                DeliveryFilter::Owner(owner) => {
                    sql.filter(delivery_requests::owner_id.eq(owner.into_inner()))
                }
                DeliveryFilter::ServiceArea(code) => {
                    sql.filter(delivery_requests::service_area_code.eq(code.as_str().to_owned()))
                }
                DeliveryFilter::State(state) => {
                    sql.filter(delivery_requests::state.eq(state.as_str()))
                }
            };
            if let Some(cursor) = owned.cursor {
                sql = sql.filter(
                    delivery_requests::created_at.lt(cursor.created_at).or(
                        delivery_requests::created_at
                            .eq(cursor.created_at)
                            .and(delivery_requests::id.lt(cursor.id.into_inner())),
                    ),
                );
            }
            let rows = sql
                .order((
                    delivery_requests::created_at.desc(),
                    delivery_requests::id.desc(),
                ))
                .limit(limit)
                .load::<DeliveryRow>(connection)?;
            rows.into_iter().map(row_to_request).collect()
        })
        .await
    }

    async fn append_history(&self, entry: &StatusHistoryEntry) -> DeliveryGatewayResult<()> {
        let request_id = entry.request_id();
        let row = to_history_row(entry)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(delivery_status_history::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        DeliveryGatewayError::NotFound(request_id)
                    }
                    _ => DeliveryGatewayError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn history(
        &self,
        id: DeliveryRequestId,
    ) -> DeliveryGatewayResult<Vec<StatusHistoryEntry>> {
        self.run_blocking(move |connection| {
            let rows = delivery_status_history::table
                .filter(delivery_status_history::request_id.eq(id.into_inner()))
                .order((
                    delivery_status_history::recorded_at.asc(),
                    delivery_status_history::sequence.asc(),
                ))
                .select(HistoryRow::as_select())
                .load::<HistoryRow>(connection)?;
            rows.into_iter().map(row_to_history).collect()
        })
        .await
    }
}

/// Conditional update with its rows already encoded for Diesel.
struct PreparedUpdate {
    request_id: DeliveryRequestId,
    expected_revision: i64,
    expected_state: DeliveryState,
    changeset: DeliveryChangeset,
    history: NewHistoryRow,
}

impl PreparedUpdate {
    fn new(update: &ConditionalUpdate) -> DeliveryGatewayResult<Self> {
        let expected_revision = revision_to_column(update.expected_revision)?;
        let next_revision = revision_to_column(update.expected_revision.next())?;
        Ok(Self {
            request_id: update.request_id,
            expected_revision,
            expected_state: update.expected_state,
            changeset: to_changeset(&update.patch, next_revision)?,
            history: to_history_row(&update.audit)?,
        })
    }
}

fn apply_conditional(
    conn: &mut PgConnection,
    update: &PreparedUpdate,
) -> DeliveryGatewayResult<DeliveryRequest> {
    let id = update.request_id.into_inner();
    let row = diesel::update(
        delivery_requests::table
            .filter(delivery_requests::id.eq(id))
            .filter(delivery_requests::revision.eq(update.expected_revision))
            .filter(delivery_requests::state.eq(update.expected_state.as_str())),
    )
    .set(&update.changeset)
    .returning(DeliveryRow::as_returning())
    .get_result::<DeliveryRow>(conn)
    .optional()?;

    let Some(row) = row else {
        let row_exists = diesel::select(exists(
            delivery_requests::table.filter(delivery_requests::id.eq(id)),
        ))
        .get_result::<bool>(conn)?;
        return Err(if row_exists {
            DeliveryGatewayError::Conflict {
                request_id: update.request_id,
                expected: Revision::new(update.expected_revision.unsigned_abs()),
            }
        } else {
            DeliveryGatewayError::NotFound(update.request_id)
        });
    };

    diesel::insert_into(delivery_status_history::table)
        .values(&update.history)
        .execute(conn)?;
    row_to_request(row)
}

fn revision_to_column(revision: Revision) -> DeliveryGatewayResult<i64> {
    i64::try_from(revision.value()).map_err(DeliveryGatewayError::persistence)
}

fn to_json<T: serde::Serialize>(value: &T) -> DeliveryGatewayResult<serde_json::Value> {
    serde_json::to_value(value).map_err(DeliveryGatewayError::persistence)
}

fn to_new_row(request: &DeliveryRequest) -> DeliveryGatewayResult<NewDeliveryRow> {
    let milestones = request.milestones();
    Ok(NewDeliveryRow {
        id: request.id().into_inner(),
        card_id: request.card_id().into_inner(),
        owner_id: request.owner_id().into_inner(),
        service_area_code: request.service_area_code().as_str().to_owned(),
        delivery_type: request.delivery_type().as_str().to_owned(),
        destination: to_json(request.destination())?,
        preferences: to_json(request.preferences())?,
        state: request.state().as_str().to_owned(),
        failure_reason: request.failure_reason().map(|r| r.as_str().to_owned()),
        failed_attempts: i32::try_from(request.failed_attempts())
            .map_err(DeliveryGatewayError::persistence)?,
        updated_photo_ref: request.updated_photo().map(|p| p.as_str().to_owned()),
        confirmation: request.confirmation().map(to_json).transpose()?,
        assigned_staff: request.assigned_staff().map(to_json).transpose()?,
        print_batch_id: request.print_batch_id().map(PrintBatchId::into_inner),
        sent_to_print_at: milestones.sent_to_print_at,
        printed_at: milestones.printed_at,
        out_for_delivery_at: milestones.out_for_delivery_at,
        delivered_at: milestones.delivered_at,
        revision: revision_to_column(request.revision())?,
        created_at: request.created_at(),
        updated_at: request.updated_at(),
    })
}

fn to_changeset(patch: &DeliveryPatch, revision: i64) -> DeliveryGatewayResult<DeliveryChangeset> {
    Ok(DeliveryChangeset {
        state: patch.state.as_str().to_owned(),
        failure_reason: patch
            .failure_reason
            .map(|reason| reason.map(|r| r.as_str().to_owned())),
        failed_attempts: patch
            .failed_attempts
            .map(i32::try_from)
            .transpose()
            .map_err(DeliveryGatewayError::persistence)?,
        print_batch_id: patch.print_batch_id.map(PrintBatchId::into_inner),
        delivery_type: patch
            .destination
            .as_ref()
            .map(|d| d.delivery_type().as_str().to_owned()),
        destination: patch.destination.as_ref().map(to_json).transpose()?,
        preferences: patch.preferences.as_ref().map(to_json).transpose()?,
        updated_photo_ref: patch.updated_photo.as_ref().map(|p| p.as_str().to_owned()),
        confirmation: patch.confirmation.as_ref().map(to_json).transpose()?,
        assigned_staff: patch.assigned_staff.as_ref().map(to_json).transpose()?,
        sent_to_print_at: patch.sent_to_print_at,
        printed_at: patch.printed_at,
        out_for_delivery_at: patch.out_for_delivery_at,
        delivered_at: patch.delivered_at,
        revision,
        updated_at: patch.updated_at,
    })
}

fn to_history_row(entry: &StatusHistoryEntry) -> DeliveryGatewayResult<NewHistoryRow> {
    Ok(NewHistoryRow {
        id: entry.id().into_inner(),
        request_id: entry.request_id().into_inner(),
        previous_state: entry.previous_state().map(|s| s.as_str().to_owned()),
        new_state: entry.new_state().as_str().to_owned(),
        actor: to_json(entry.actor())?,
        reason: entry.reason().map(str::to_owned),
        recorded_at: entry.recorded_at(),
    })
}

fn from_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
) -> DeliveryGatewayResult<T> {
    serde_json::from_value(value).map_err(DeliveryGatewayError::invalid_persisted_data)
}

fn row_to_request(row: DeliveryRow) -> DeliveryGatewayResult<DeliveryRequest> {
    let DeliveryRow {
        id,
        card_id,
        owner_id,
        service_area_code,
        delivery_type,
        destination: destination_json,
        preferences,
        state,
        failure_reason,
        failed_attempts,
        updated_photo_ref,
        confirmation,
        assigned_staff,
        print_batch_id,
        sent_to_print_at,
        printed_at,
        out_for_delivery_at,
        delivered_at,
        revision,
        created_at,
        updated_at,
    } = row;

    let destination: Destination = from_json(destination_json)?;
    let stored_type = DeliveryType::try_from(delivery_type.as_str())
        .map_err(DeliveryGatewayError::invalid_persisted_data)?;
    if stored_type != destination.delivery_type() {
        return Err(DeliveryGatewayError::invalid_persisted_data(
            ParseDeliveryValueError::new("delivery type for destination", &delivery_type),
        ));
    }

    let data = PersistedDeliveryData {
        id: DeliveryRequestId::from_uuid(id),
        card_id: CardId::from_uuid(card_id),
        owner_id: ResidentId::from_uuid(owner_id),
        service_area_code: ServiceAreaCode::new(service_area_code)
            .map_err(DeliveryGatewayError::invalid_persisted_data)?,
        destination,
        preferences: from_json(preferences)?,
        state: DeliveryState::try_from(state.as_str())
            .map_err(DeliveryGatewayError::invalid_persisted_data)?,
        failure_reason: failure_reason
            .map(|reason| FailureReason::try_from(reason.as_str()))
            .transpose()
            .map_err(DeliveryGatewayError::invalid_persisted_data)?,
        failed_attempts: u32::try_from(failed_attempts)
            .map_err(DeliveryGatewayError::invalid_persisted_data)?,
        updated_photo: updated_photo_ref
            .map(|photo| FileRef::new(photo, "updated photo"))
            .transpose()
            .map_err(DeliveryGatewayError::invalid_persisted_data)?,
        confirmation: confirmation.map(from_json).transpose()?,
        assigned_staff: assigned_staff.map(from_json).transpose()?,
        print_batch_id: print_batch_id.map(PrintBatchId::from_uuid),
        milestones: Milestones {
            sent_to_print_at,
            printed_at,
            out_for_delivery_at,
            delivered_at,
        },
        revision: Revision::new(
            u64::try_from(revision).map_err(DeliveryGatewayError::invalid_persisted_data)?,
        ),
        created_at,
        updated_at,
    };
    if data.state.carries_failure() != data.failure_reason.is_some() {
        return Err(DeliveryGatewayError::invalid_persisted_data(
            ParseDeliveryValueError::new("failure reason for state", &state),
        ));
    }
    Ok(DeliveryRequest::from_persisted(data))
}

fn row_to_history(row: HistoryRow) -> DeliveryGatewayResult<StatusHistoryEntry> {
    let previous_state = row
        .previous_state
        .map(|state| DeliveryState::try_from(state.as_str()))
        .transpose()
        .map_err(DeliveryGatewayError::invalid_persisted_data)?;
    let new_state = DeliveryState::try_from(row.new_state.as_str())
        .map_err(DeliveryGatewayError::invalid_persisted_data)?;
    let actor: Actor = from_json(row.actor)?;
    Ok(StatusHistoryEntry::record(
        DeliveryRequestId::from_uuid(row.request_id),
        previous_state,
        new_state,
        actor,
        row.reason,
        row.recorded_at,
    )
    .with_id(HistoryEntryId::from_uuid(row.id)))
}
