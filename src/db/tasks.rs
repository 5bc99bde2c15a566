//! Task row queries and writes.
//!
//! List views return workflow header rows (`step_id = 0`); detail views
//! return every row for one delivery code. Non-admin visibility is decided
//! by matching the caller's addresses against the delimited `emails` column:
//! a SQL LIKE narrows the candidates, the word-boundary check in
//! [`crate::emails`] is authoritative.

use super::{Database, now_rfc3339};
use crate::emails::{list_matches, membership_patterns};
use crate::types::{TaskPatch, TaskRow, UpsertOutcome};
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use std::collections::BTreeSet;

const TASK_COLUMNS: &str = "key, delivery_code, del_code, step_id, task_details, \
     frequency_timeline, client, short_description, planned_start, planned_delivery, \
     responsibility, current_status, email, emails, total_tasks, completed_tasks, \
     planned_tasks, percent_complete, time_left, card_corner_status, created_at, updated_at";

fn parse_task_row(row: &Row) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        key: row.get("key")?,
        delivery_code: row.get("delivery_code")?,
        del_code: row.get("del_code")?,
        step_id: row.get("step_id")?,
        task_details: row.get("task_details")?,
        frequency_timeline: row.get("frequency_timeline")?,
        client: row.get("client")?,
        short_description: row.get("short_description")?,
        planned_start: row.get("planned_start")?,
        planned_delivery: row.get("planned_delivery")?,
        responsibility: row.get("responsibility")?,
        current_status: row.get("current_status")?,
        email: row.get("email")?,
        emails: row.get("emails")?,
        total_tasks: row.get("total_tasks")?,
        completed_tasks: row.get("completed_tasks")?,
        planned_tasks: row.get("planned_tasks")?,
        percent_complete: row.get("percent_complete")?,
        time_left: row.get("time_left")?,
        card_corner_status: row.get("card_corner_status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Build `lower(emails) LIKE` prefilter conditions, one per address,
/// starting at `first_idx`. Returns the OR-joined clause.
fn like_prefilter(emails: &[String], first_idx: usize) -> String {
    let conditions: Vec<String> = (0..emails.len())
        .map(|i| format!("lower(emails) LIKE '%' || ?{} || '%'", first_idx + i))
        .collect();
    conditions.join(" OR ")
}

impl Database {
    /// Distinct non-empty responsibility values, sorted.
    pub fn distinct_persons(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT responsibility FROM tasks
                 WHERE responsibility IS NOT NULL AND responsibility != ''
                 ORDER BY responsibility",
            )?;
            let persons = stmt
                .query_map([], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(persons)
        })
    }

    /// Header rows for every delivery, ordered by code (admin list view).
    pub fn delivery_headers(&self, limit: i64, offset: i64) -> Result<Vec<TaskRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE step_id = 0
                 ORDER BY del_code LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit, offset], parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// Header rows for the given delivery codes, ordered by code
    /// (non-admin list view, after code resolution).
    pub fn delivery_headers_for_codes(
        &self,
        codes: &[String],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TaskRow>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=codes.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE del_code IN ({}) AND step_id = 0
                 ORDER BY del_code LIMIT ?{} OFFSET ?{}",
                placeholders.join(", "),
                codes.len() + 1,
                codes.len() + 2,
            );

            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            for code in codes {
                params_vec.push(Box::new(code.clone()));
            }
            params_vec.push(Box::new(limit));
            params_vec.push(Box::new(offset));
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_refs.as_slice(), parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// Distinct delivery codes with at least one row assigned to one of the
    /// given addresses.
    pub fn delivery_codes_for_emails(&self, emails: &[String]) -> Result<Vec<String>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let patterns = membership_patterns(emails);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT DISTINCT del_code, emails FROM tasks WHERE {}",
                like_prefilter(emails, 1)
            );
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            for email in emails {
                params_vec.push(Box::new(email.clone()));
            }
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let mut codes = BTreeSet::new();
            let candidates = stmt.query_map(params_refs.as_slice(), |row| {
                let code: String = row.get(0)?;
                let list: Option<String> = row.get(1)?;
                Ok((code, list))
            })?;
            for candidate in candidates.filter_map(|r| r.ok()) {
                let (code, list) = candidate;
                if let Some(list) = list
                    && list_matches(&list, &patterns)
                {
                    codes.insert(code);
                }
            }
            Ok(codes.into_iter().collect())
        })
    }

    /// Every row for one delivery code, header first (admin detail view).
    pub fn delivery_rows(&self, del_code: &str) -> Result<Vec<TaskRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE del_code = ?1 ORDER BY step_id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![del_code], parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// Header row(s) for one delivery code.
    pub fn delivery_header_rows(&self, del_code: &str) -> Result<Vec<TaskRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE del_code = ?1 AND step_id = 0"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![del_code], parse_task_row)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// Nonzero-step rows for one delivery code assigned to one of the given
    /// addresses.
    pub fn assigned_task_rows(&self, del_code: &str, emails: &[String]) -> Result<Vec<TaskRow>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let patterns = membership_patterns(emails);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE del_code = ?1 AND step_id != 0 AND ({})
                 ORDER BY step_id ASC",
                like_prefilter(emails, 2)
            );
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            params_vec.push(Box::new(del_code.to_string()));
            for email in emails {
                params_vec.push(Box::new(email.clone()));
            }
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows: Vec<TaskRow> = stmt
                .query_map(params_refs.as_slice(), parse_task_row)?
                .filter_map(|r| r.ok())
                .filter(|row| {
                    row.emails
                        .as_deref()
                        .is_some_and(|list| list_matches(list, &patterns))
                })
                .collect();
            Ok(rows)
        })
    }

    /// Whether a task row with this key exists.
    pub fn task_exists(&self, key: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT key FROM tasks WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Store a task row: update when the key exists, insert otherwise.
    pub fn upsert_task(&self, task: &TaskRow) -> Result<UpsertOutcome> {
        let exists = self.task_exists(task.key)?;
        let stamp = now_rfc3339();
        self.with_conn(|conn| {
            if exists {
                conn.execute(
                    "UPDATE tasks SET
                        delivery_code = ?2,
                        del_code = ?3,
                        step_id = ?4,
                        task_details = ?5,
                        frequency_timeline = ?6,
                        client = ?7,
                        short_description = ?8,
                        planned_start = ?9,
                        planned_delivery = ?10,
                        responsibility = ?11,
                        current_status = ?12,
                        email = ?13,
                        emails = ?14,
                        total_tasks = ?15,
                        completed_tasks = ?16,
                        planned_tasks = ?17,
                        percent_complete = ?18,
                        time_left = ?19,
                        card_corner_status = ?20,
                        created_at = COALESCE(?21, created_at),
                        updated_at = ?22
                     WHERE key = ?1",
                    params![
                        task.key,
                        task.delivery_code,
                        task.del_code,
                        task.step_id,
                        task.task_details,
                        task.frequency_timeline,
                        task.client,
                        task.short_description,
                        task.planned_start,
                        task.planned_delivery,
                        task.responsibility,
                        task.current_status,
                        task.email,
                        task.emails,
                        task.total_tasks,
                        task.completed_tasks,
                        task.planned_tasks,
                        task.percent_complete,
                        task.time_left,
                        task.card_corner_status,
                        task.created_at,
                        task.updated_at.clone().unwrap_or_else(|| stamp.clone()),
                    ],
                )?;
                Ok(UpsertOutcome::Updated)
            } else {
                conn.execute(
                    &format!(
                        "INSERT INTO tasks ({TASK_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                                 ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)"
                    ),
                    params![
                        task.key,
                        task.delivery_code,
                        task.del_code,
                        task.step_id,
                        task.task_details,
                        task.frequency_timeline,
                        task.client,
                        task.short_description,
                        task.planned_start,
                        task.planned_delivery,
                        task.responsibility,
                        task.current_status,
                        task.email,
                        task.emails,
                        task.total_tasks,
                        task.completed_tasks,
                        task.planned_tasks,
                        task.percent_complete,
                        task.time_left,
                        task.card_corner_status,
                        task.created_at.clone().unwrap_or_else(|| stamp.clone()),
                        task.updated_at.clone().unwrap_or_else(|| stamp.clone()),
                    ],
                )?;
                Ok(UpsertOutcome::Inserted)
            }
        })
    }

    /// Apply a partial update to one task row. Returns the number of rows
    /// touched (0 when the key does not exist).
    pub fn patch_task(&self, key: i64, patch: &TaskPatch) -> Result<usize> {
        if patch.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            // Build dynamic update query
            let mut updates = vec!["updated_at = ?1".to_string()];
            let mut param_idx = 2;

            let text_fields = [
                ("task_details", &patch.task_details),
                ("planned_start", &patch.planned_start),
                ("planned_delivery", &patch.planned_delivery),
                ("responsibility", &patch.responsibility),
                ("current_status", &patch.current_status),
                ("client", &patch.client),
            ];
            let count_fields = [
                ("total_tasks", &patch.total_tasks),
                ("planned_tasks", &patch.planned_tasks),
                ("completed_tasks", &patch.completed_tasks),
            ];

            for (column, value) in &text_fields {
                if value.is_some() {
                    updates.push(format!("{} = ?{}", column, param_idx));
                    param_idx += 1;
                }
            }
            for (column, value) in &count_fields {
                if value.is_some() {
                    updates.push(format!("{} = ?{}", column, param_idx));
                    param_idx += 1;
                }
            }

            let sql = format!(
                "UPDATE tasks SET {} WHERE key = ?{}",
                updates.join(", "),
                param_idx
            );

            // Build params list in the same order
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            params_vec.push(Box::new(now_rfc3339()));
            for (_, value) in &text_fields {
                if let Some(v) = value {
                    params_vec.push(Box::new(v.clone()));
                }
            }
            for (_, value) in &count_fields {
                if let Some(v) = value {
                    params_vec.push(Box::new(*v));
                }
            }
            params_vec.push(Box::new(key));

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let touched = conn.execute(&sql, params_refs.as_slice())?;
            Ok(touched)
        })
    }

    /// Update the planned/total task counts on a delivery's header row.
    pub fn update_delivery_counts(
        &self,
        del_code: &str,
        planned_tasks: Option<i64>,
        total_tasks: Option<i64>,
    ) -> Result<usize> {
        if planned_tasks.is_none() && total_tasks.is_none() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            let mut param_idx = 1;

            if let Some(planned) = planned_tasks {
                sets.push(format!("planned_tasks = ?{}", param_idx));
                params_vec.push(Box::new(planned));
                param_idx += 1;
            }
            if let Some(total) = total_tasks {
                sets.push(format!("total_tasks = ?{}", param_idx));
                params_vec.push(Box::new(total));
                param_idx += 1;
            }
            sets.push(format!("updated_at = ?{}", param_idx));
            params_vec.push(Box::new(now_rfc3339()));
            param_idx += 1;

            let sql = format!(
                "UPDATE tasks SET {} WHERE del_code = ?{} AND step_id = 0",
                sets.join(", "),
                param_idx
            );
            params_vec.push(Box::new(del_code.to_string()));
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let touched = conn.execute(&sql, params_refs.as_slice())?;
            Ok(touched)
        })
    }

    /// Delete every task row carrying the delivery code. Returns the number
    /// of rows removed. Allocation rows for the deleted keys are left behind.
    pub fn delete_delivery(&self, del_code: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM tasks WHERE del_code = ?1",
                params![del_code],
            )?;
            Ok(removed)
        })
    }

    /// Set the planned delivery timestamp on one task row.
    pub fn set_deadline(&self, key: i64, planned_delivery: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let touched = conn.execute(
                "UPDATE tasks SET planned_delivery = ?1, updated_at = ?2 WHERE key = ?3",
                params![planned_delivery, now_rfc3339(), key],
            )?;
            Ok(touched)
        })
    }

    /// Reassign one task row, optionally replacing its assignment list.
    pub fn reassign_task(
        &self,
        key: i64,
        responsibility: &str,
        emails: Option<&str>,
    ) -> Result<usize> {
        self.with_conn(|conn| {
            let touched = match emails {
                Some(list) => conn.execute(
                    "UPDATE tasks SET responsibility = ?1, emails = ?2, updated_at = ?3
                     WHERE key = ?4",
                    params![responsibility, list, now_rfc3339(), key],
                )?,
                None => conn.execute(
                    "UPDATE tasks SET responsibility = ?1, updated_at = ?2 WHERE key = ?3",
                    params![responsibility, now_rfc3339(), key],
                )?,
            };
            Ok(touched)
        })
    }
}
