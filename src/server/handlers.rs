//! REST endpoint handlers.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::AppState;
use crate::emails::split_emails;
use crate::error::ApiError;
use crate::types::{
    DayAllocation, KeyAllocations, PersonDayRow, SliderInput, TaskPatch, TaskRow, UpsertOutcome,
};

/// Default page size for the delivery list view.
const DEFAULT_LIMIT: i64 = 500;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Plain message response used by write endpoints.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn reply(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Distinct responsibility values across all task rows.
pub async fn persons(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let persons = state.db().distinct_persons()?;
    debug!(count = persons.len(), "Fetched distinct persons");
    Ok(Json(persons))
}

/// Query parameters for the delivery data view.
#[derive(Debug, Deserialize)]
pub struct DataParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Comma-delimited list of the caller's addresses.
    pub email: Option<String>,
    /// When present, switches from the list view to the detail view.
    #[serde(alias = "delCode")]
    pub del_code: Option<String>,
}

/// Group task rows into a map keyed by delivery code.
fn group_by_delivery(rows: Vec<TaskRow>) -> BTreeMap<String, Vec<TaskRow>> {
    let mut grouped: BTreeMap<String, Vec<TaskRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.del_code.clone()).or_default().push(row);
    }
    grouped
}

/// Delivery data, grouped by delivery code.
///
/// Admins see everything. Other callers see workflow header rows plus the
/// task rows whose `emails` column matches one of their addresses; in the
/// list view their deliveries are resolved from those matches first.
pub async fn data(
    State(state): State<AppState>,
    Query(params): Query<DataParams>,
) -> Result<Json<BTreeMap<String, Vec<TaskRow>>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);
    let offset = params.offset.unwrap_or(0).max(0);
    let emails = params.email.as_deref().map(split_emails).unwrap_or_default();
    let is_admin = state.admins().any_admin(&emails);
    let del_code = params.del_code.filter(|c| !c.is_empty());

    if emails.is_empty() {
        return Err(ApiError::bad_request(
            "Email is required for non-admin requests",
        ));
    }

    let rows = match del_code {
        Some(ref code) => {
            debug!(del_code = %code, is_admin, "Delivery detail view");
            if is_admin {
                state.db().delivery_rows(code)?
            } else {
                let mut rows = state.db().delivery_header_rows(code)?;
                rows.extend(state.db().assigned_task_rows(code, &emails)?);
                rows
            }
        }
        None => {
            debug!(is_admin, limit, offset, "Delivery list view");
            if is_admin {
                state.db().delivery_headers(limit, offset)?
            } else {
                let codes = state.db().delivery_codes_for_emails(&emails)?;
                state.db().delivery_headers_for_codes(&codes, limit, offset)?
            }
        }
    };

    Ok(Json(group_by_delivery(rows)))
}

/// Per-key daily allocations, grouped by task key with summed durations.
pub async fn per_key_per_day(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<i64, KeyAllocations>>, ApiError> {
    let grouped = state.db().allocations_by_key()?;
    Ok(Json(grouped))
}

/// Per-person daily aggregate rows.
pub async fn per_person_per_day(
    State(state): State<AppState>,
) -> Result<Json<Vec<PersonDayRow>>, ApiError> {
    let rows = state.db().person_day_rows()?;
    Ok(Json(rows))
}

/// Body of the task upsert endpoint: a full task row plus its slider rows.
#[derive(Debug, Deserialize)]
pub struct TaskUpsertBody {
    #[serde(flatten)]
    pub task: TaskRow,
    #[serde(default)]
    pub sliders: Vec<SliderInput>,
}

/// Response for the task upsert endpoint.
#[derive(Serialize)]
pub struct TaskUpsertResponse {
    pub message: String,
    pub task: UpsertOutcome,
    pub sliders: usize,
}

/// Store or update one task row and its slider allocations.
pub async fn post_task(
    State(state): State<AppState>,
    Json(body): Json<TaskUpsertBody>,
) -> Result<Json<TaskUpsertResponse>, ApiError> {
    if body.sliders.is_empty() {
        return Err(ApiError::bad_request("Slider data is mandatory"));
    }

    let outcome = state.db().upsert_task(&body.task)?;
    for slider in &body.sliders {
        let alloc = DayAllocation {
            key: body.task.key,
            day: slider.day.clone(),
            slot: slider.slot.clone(),
            duration: slider.duration,
            responsibility: slider.person_responsible.clone(),
        };
        state.db().upsert_allocation(&alloc)?;
    }

    info!(
        key = body.task.key,
        outcome = ?outcome,
        sliders = body.sliders.len(),
        "Task stored"
    );
    Ok(Json(TaskUpsertResponse {
        message: "Task and slider data stored or updated successfully".to_string(),
        task: outcome,
        sliders: body.sliders.len(),
    }))
}

/// Partially update one task row by key.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<MessageResponse>, ApiError> {
    let key = parse_key(&id)?;
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    let touched = state.db().patch_task(key, &patch)?;
    if touched == 0 {
        return Err(ApiError::not_found(format!("Task {}", key)));
    }
    Ok(MessageResponse::reply("Task updated successfully"))
}

/// Response for the delivery delete endpoint.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted: usize,
}

/// Delete every task row for one delivery code.
pub async fn delete_delivery(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.db().delete_delivery(&id)?;
    info!(del_code = %id, deleted, "Delivery deleted");
    Ok(Json(DeleteResponse {
        message: "All tasks with the specified delivery code were deleted".to_string(),
        deleted,
    }))
}

/// Body for the delivery count update endpoint.
#[derive(Debug, Deserialize)]
pub struct DeliveryCountsBody {
    #[serde(default, alias = "newPlannedTasks")]
    pub planned_tasks: Option<i64>,
    #[serde(default, alias = "newTotalTasks")]
    pub total_tasks: Option<i64>,
}

/// Update the planned/total task counts on a delivery's header row.
pub async fn update_delivery_counts(
    State(state): State<AppState>,
    Path(del_code): Path<String>,
    Json(body): Json<DeliveryCountsBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    if body.planned_tasks.is_none() && body.total_tasks.is_none() {
        return Err(ApiError::bad_request(
            "At least one of planned_tasks or total_tasks must be provided",
        ));
    }
    let touched =
        state
            .db()
            .update_delivery_counts(&del_code, body.planned_tasks, body.total_tasks)?;
    if touched == 0 {
        return Err(ApiError::not_found(format!("Delivery {}", del_code)));
    }
    Ok(MessageResponse::reply("Delivery task counts updated successfully"))
}

/// Body for the admin deadline endpoint.
#[derive(Debug, Deserialize)]
pub struct DeadlineBody {
    /// The caller's address, checked against the allow-list.
    pub email: String,
    #[serde(alias = "plannedDelivery")]
    pub planned_delivery: String,
}

/// Admin-gated deadline edit.
pub async fn set_deadline(
    State(state): State<AppState>,
    Path(key): Path<i64>,
    Json(body): Json<DeadlineBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_admin(&state, &body.email)?;
    let touched = state.db().set_deadline(key, &body.planned_delivery)?;
    if touched == 0 {
        return Err(ApiError::not_found(format!("Task {}", key)));
    }
    info!(key, by = %body.email, "Deadline updated");
    Ok(MessageResponse::reply("Deadline updated successfully"))
}

/// Body for the admin reassignment endpoint.
#[derive(Debug, Deserialize)]
pub struct ReassignBody {
    /// The caller's address, checked against the allow-list.
    pub email: String,
    pub responsibility: String,
    /// Optional replacement for the task's assignment list.
    #[serde(default)]
    pub emails: Option<String>,
}

/// Admin-gated reassignment.
pub async fn reassign_task(
    State(state): State<AppState>,
    Path(key): Path<i64>,
    Json(body): Json<ReassignBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_admin(&state, &body.email)?;
    let touched =
        state
            .db()
            .reassign_task(key, &body.responsibility, body.emails.as_deref())?;
    if touched == 0 {
        return Err(ApiError::not_found(format!("Task {}", key)));
    }
    info!(key, to = %body.responsibility, by = %body.email, "Task reassigned");
    Ok(MessageResponse::reply("Task reassigned successfully"))
}

fn parse_key(id: &str) -> Result<i64, ApiError> {
    id.parse::<i64>()
        .map_err(|_| ApiError::bad_request(format!("Task key must be an integer, got '{}'", id)))
}

fn require_admin(state: &AppState, email: &str) -> Result<(), ApiError> {
    if state.admins().is_admin(email) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "{} is not on the admin allow-list",
            email
        )))
    }
}
