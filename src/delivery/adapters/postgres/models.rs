//! Diesel row models for delivery persistence.

use super::schema::{delivery_requests, delivery_status_history};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for delivery requests.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = delivery_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeliveryRow {
    pub id: uuid::Uuid,
    pub card_id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub service_area_code: String,
    pub delivery_type: String,
    pub destination: Value,
    pub preferences: Value,
    pub state: String,
    pub failure_reason: Option<String>,
    pub failed_attempts: i32,
    pub updated_photo_ref: Option<String>,
    pub confirmation: Option<Value>,
    pub assigned_staff: Option<Value>,
    pub print_batch_id: Option<uuid::Uuid>,
    pub sent_to_print_at: Option<DateTime<Utc>>,
    pub printed_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for delivery requests.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = delivery_requests)]
pub struct NewDeliveryRow {
    pub id: uuid::Uuid,
    pub card_id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub service_area_code: String,
    pub delivery_type: String,
    pub destination: Value,
    pub preferences: Value,
    pub state: String,
    pub failure_reason: Option<String>,
    pub failed_attempts: i32,
    pub updated_photo_ref: Option<String>,
    pub confirmation: Option<Value>,
    pub assigned_staff: Option<Value>,
    pub print_batch_id: Option<uuid::Uuid>,
    pub sent_to_print_at: Option<DateTime<Utc>>,
    pub printed_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for delivery requests; `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = delivery_requests)]
pub struct DeliveryChangeset {
    pub state: String,
    pub failure_reason: Option<Option<String>>,
    pub failed_attempts: Option<i32>,
    pub print_batch_id: Option<uuid::Uuid>,
    pub delivery_type: Option<String>,
    pub destination: Option<Value>,
    pub preferences: Option<Value>,
    pub updated_photo_ref: Option<String>,
    pub confirmation: Option<Value>,
    pub assigned_staff: Option<Value>,
    pub sent_to_print_at: Option<DateTime<Utc>>,
    pub printed_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<Option<DateTime<Utc>>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub revision: i64,
    pub updated_at: DateTime<Utc>,
}

/// Query result row for status history.
///
/// The `sequence` column only orders rows in SQL and is not selected.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = delivery_status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HistoryRow {
    pub id: uuid::Uuid,
    pub request_id: uuid::Uuid,
    pub previous_state: Option<String>,
    pub new_state: String,
    pub actor: Value,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Insert model for status history.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = delivery_status_history)]
pub struct NewHistoryRow {
    pub id: uuid::Uuid,
    pub request_id: uuid::Uuid,
    pub previous_state: Option<String>,
    pub new_state: String,
    pub actor: Value,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
