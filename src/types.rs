//! Core types for the Delivery Board service.

use serde::{Deserialize, Serialize};

/// A task row. `step_id == 0` marks the workflow header row for a delivery
/// code; nonzero step ids are the individual tasks within the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRow {
    pub key: i64,
    #[serde(default)]
    pub delivery_code: Option<String>,
    pub del_code: String,
    #[serde(default)]
    pub step_id: i64,
    #[serde(default)]
    pub task_details: Option<String>,
    #[serde(default)]
    pub frequency_timeline: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub planned_start: Option<String>,
    #[serde(default)]
    pub planned_delivery: Option<String>,
    #[serde(default)]
    pub responsibility: Option<String>,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Delimited list of addresses used for assignment matching.
    #[serde(default)]
    pub emails: Option<String>,
    #[serde(default)]
    pub total_tasks: Option<i64>,
    #[serde(default)]
    pub completed_tasks: Option<i64>,
    #[serde(default)]
    pub planned_tasks: Option<i64>,
    #[serde(default)]
    pub percent_complete: Option<f64>,
    #[serde(default)]
    pub time_left: Option<String>,
    #[serde(default)]
    pub card_corner_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One slider entry from the planner UI, scoped to the task it arrives with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliderInput {
    pub day: String,
    pub slot: String,
    pub duration: i64,
    #[serde(default, alias = "personResponsible")]
    pub person_responsible: Option<String>,
}

/// A persisted per-key daily allocation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAllocation {
    pub key: i64,
    pub day: String,
    pub slot: String,
    pub duration: i64,
    pub responsibility: Option<String>,
}

/// Allocations for one task key with the summed duration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeyAllocations {
    pub total_duration: i64,
    pub entries: Vec<DayAllocation>,
}

/// Aggregate minutes for one person on one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDayRow {
    pub responsibility: String,
    pub day: String,
    pub duration_minutes: i64,
}

/// Partial update of a task row. Only the provided fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub task_details: Option<String>,
    #[serde(default)]
    pub planned_start: Option<String>,
    #[serde(default)]
    pub planned_delivery: Option<String>,
    #[serde(default)]
    pub responsibility: Option<String>,
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub total_tasks: Option<i64>,
    #[serde(default)]
    pub planned_tasks: Option<i64>,
    #[serde(default)]
    pub completed_tasks: Option<i64>,
}

impl TaskPatch {
    /// True when no field was provided.
    pub fn is_empty(&self) -> bool {
        self.task_details.is_none()
            && self.planned_start.is_none()
            && self.planned_delivery.is_none()
            && self.responsibility.is_none()
            && self.current_status.is_none()
            && self.client.is_none()
            && self.total_tasks.is_none()
            && self.planned_tasks.is_none()
            && self.completed_tasks.is_none()
    }
}

/// Outcome of a check-then-update-or-insert write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}
