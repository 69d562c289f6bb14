//! Diesel schema for delivery persistence.

diesel::table! {
    /// Delivery request rows.
    delivery_requests (id) {
        /// Request identifier.
        id -> Uuid,
        /// Card being delivered.
        card_id -> Uuid,
        /// Owning resident.
        owner_id -> Uuid,
        /// Routing and reporting key.
        #[max_length = 64]
        service_area_code -> Varchar,
        /// `delivery` or `pickup`, denormalized from `destination`.
        #[max_length = 16]
        delivery_type -> Varchar,
        /// Destination payload (address or pickup marker).
        destination -> Jsonb,
        /// Scheduling preference payload.
        preferences -> Jsonb,
        /// Lifecycle state.
        #[max_length = 32]
        state -> Varchar,
        /// Latest failure reason.
        #[max_length = 32]
        failure_reason -> Nullable<Varchar>,
        /// Failed courier attempt count.
        failed_attempts -> Int4,
        /// Replacement photo reference.
        updated_photo_ref -> Nullable<Text>,
        /// Self-confirmation evidence payload.
        confirmation -> Nullable<Jsonb>,
        /// Assigned staff payload.
        assigned_staff -> Nullable<Jsonb>,
        /// Print batch link.
        print_batch_id -> Nullable<Uuid>,
        /// Sent-to-print milestone.
        sent_to_print_at -> Nullable<Timestamptz>,
        /// Printed milestone.
        printed_at -> Nullable<Timestamptz>,
        /// Latest dispatch milestone.
        out_for_delivery_at -> Nullable<Timestamptz>,
        /// Delivered milestone.
        delivered_at -> Nullable<Timestamptz>,
        /// Optimistic concurrency revision.
        revision -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only status history rows.
    delivery_status_history (id) {
        /// Entry identifier.
        id -> Uuid,
        /// Insertion order tiebreaker.
        sequence -> Int8,
        /// Owning request.
        request_id -> Uuid,
        /// State before the change.
        #[max_length = 32]
        previous_state -> Nullable<Varchar>,
        /// State after the change.
        #[max_length = 32]
        new_state -> Varchar,
        /// Actor payload.
        actor -> Jsonb,
        /// Recorded reason.
        reason -> Nullable<Text>,
        /// Recording timestamp.
        recorded_at -> Timestamptz,
    }
}

diesel::joinable!(delivery_status_history -> delivery_requests (request_id));
diesel::allow_tables_to_appear_in_same_query!(delivery_requests, delivery_status_history);
