//! Daily time-allocation rows.
//!
//! One row per (key, day, slot). Rows originate as planner "sliders" and are
//! written with the same check-then-update-or-insert shape as task rows.

use super::Database;
use crate::types::{DayAllocation, KeyAllocations, PersonDayRow, UpsertOutcome};
use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use std::collections::BTreeMap;

impl Database {
    /// Store one allocation row: update the duration and responsibility when
    /// the (key, day, slot) row exists, insert otherwise.
    pub fn upsert_allocation(&self, alloc: &DayAllocation) -> Result<UpsertOutcome> {
        self.with_conn(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT duration FROM day_allocations
                     WHERE key = ?1 AND day = ?2 AND slot = ?3",
                    params![alloc.key, alloc.day, alloc.slot],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                conn.execute(
                    "UPDATE day_allocations SET duration = ?4, responsibility = ?5
                     WHERE key = ?1 AND day = ?2 AND slot = ?3",
                    params![
                        alloc.key,
                        alloc.day,
                        alloc.slot,
                        alloc.duration,
                        alloc.responsibility
                    ],
                )?;
                Ok(UpsertOutcome::Updated)
            } else {
                conn.execute(
                    "INSERT INTO day_allocations (key, day, slot, duration, responsibility)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        alloc.key,
                        alloc.day,
                        alloc.slot,
                        alloc.duration,
                        alloc.responsibility
                    ],
                )?;
                Ok(UpsertOutcome::Inserted)
            }
        })
    }

    /// All allocation rows grouped per task key, with summed durations.
    pub fn allocations_by_key(&self) -> Result<BTreeMap<i64, KeyAllocations>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, day, slot, duration, responsibility
                 FROM day_allocations
                 ORDER BY key, day, slot",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(DayAllocation {
                    key: row.get(0)?,
                    day: row.get(1)?,
                    slot: row.get(2)?,
                    duration: row.get(3)?,
                    responsibility: row.get(4)?,
                })
            })?;

            let mut grouped: BTreeMap<i64, KeyAllocations> = BTreeMap::new();
            for alloc in rows.filter_map(|r| r.ok()) {
                let entry = grouped.entry(alloc.key).or_default();
                entry.total_duration += alloc.duration;
                entry.entries.push(alloc);
            }
            Ok(grouped)
        })
    }

    /// Allocation rows for one task key, in day/slot order.
    pub fn allocations_for_key(&self, key: i64) -> Result<Vec<DayAllocation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, day, slot, duration, responsibility
                 FROM day_allocations
                 WHERE key = ?1
                 ORDER BY day, slot",
            )?;
            let rows = stmt
                .query_map(params![key], |row| {
                    Ok(DayAllocation {
                        key: row.get(0)?,
                        day: row.get(1)?,
                        slot: row.get(2)?,
                        duration: row.get(3)?,
                        responsibility: row.get(4)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// All person-day aggregate rows.
    pub fn person_day_rows(&self) -> Result<Vec<PersonDayRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT responsibility, day, duration_minutes
                 FROM person_day_totals
                 ORDER BY responsibility, day",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(PersonDayRow {
                        responsibility: row.get(0)?,
                        day: row.get(1)?,
                        duration_minutes: row.get(2)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        })
    }

    /// Replace the aggregate minutes for one person on one day.
    pub fn set_person_day_total(
        &self,
        responsibility: &str,
        day: &str,
        duration_minutes: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO person_day_totals (responsibility, day, duration_minutes)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (responsibility, day)
                 DO UPDATE SET duration_minutes = excluded.duration_minutes",
                params![responsibility, day, duration_minutes],
            )?;
            Ok(())
        })
    }
}
