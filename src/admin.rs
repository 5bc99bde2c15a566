//! Admin allow-list with time-bounded caching.
//!
//! The allow-list is the configured seed addresses plus whatever the
//! `admin_access` table grants. The table changes rarely, so membership
//! checks read an in-process snapshot that is refreshed once it is older
//! than the configured TTL. `ArcSwap` lets a refresh replace the snapshot
//! without blocking concurrent readers.

use crate::db::Database;
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One cached view of the allow-list. `fetched_at` is `None` for the initial
/// seed-only snapshot, which is always considered stale.
struct Snapshot {
    fetched_at: Option<Instant>,
    emails: HashSet<String>,
}

/// TTL-cached admin allow-list.
pub struct AdminDirectory {
    db: Database,
    seed: HashSet<String>,
    ttl: Duration,
    snapshot: ArcSwap<Snapshot>,
}

impl AdminDirectory {
    /// Create a directory seeded with the configured addresses. Seeds stay
    /// on the allow-list regardless of what the table says.
    pub fn new(db: Database, seed: &[String], ttl: Duration) -> Self {
        let seed: HashSet<String> = seed
            .iter()
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            db,
            ttl,
            snapshot: ArcSwap::from_pointee(Snapshot {
                fetched_at: None,
                emails: seed.clone(),
            }),
            seed,
        }
    }

    /// Whether the address is on the allow-list. Case-insensitive.
    pub fn is_admin(&self, email: &str) -> bool {
        self.refresh_if_stale();
        self.snapshot
            .load()
            .emails
            .contains(&email.trim().to_ascii_lowercase())
    }

    /// Whether any of the addresses is on the allow-list.
    pub fn any_admin(&self, emails: &[String]) -> bool {
        emails.iter().any(|e| self.is_admin(e))
    }

    /// Number of addresses in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot.load().emails.len()
    }

    /// True when the current snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn refresh_if_stale(&self) {
        let current = self.snapshot.load();
        let stale = current
            .fetched_at
            .is_none_or(|at| at.elapsed() >= self.ttl);
        if !stale {
            return;
        }

        match self.db.admin_emails() {
            Ok(list) => {
                debug!(admins = list.len(), "Admin allow-list refreshed");
                let mut emails = self.seed.clone();
                emails.extend(list);
                self.snapshot.store(Arc::new(Snapshot {
                    fetched_at: Some(Instant::now()),
                    emails,
                }));
            }
            Err(e) => {
                // Keep the previous list; stamp the failure so a broken table
                // is retried once per TTL rather than on every request.
                warn!("Failed to refresh admin allow-list: {}", e);
                self.snapshot.store(Arc::new(Snapshot {
                    fetched_at: Some(Instant::now()),
                    emails: current.emails.clone(),
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().expect("Failed to create in-memory database")
    }

    #[test]
    fn seed_addresses_stay_on_the_list() {
        let db = setup_db();
        let dir = AdminDirectory::new(
            db.clone(),
            &["Boss@Example.com".to_string()],
            Duration::ZERO,
        );
        // The table is empty; the seed still answers, case-insensitively.
        assert!(dir.is_admin("boss@example.com"));
        assert!(dir.is_admin(" BOSS@example.com "));
        assert!(!dir.is_admin("other@example.com"));
    }

    #[test]
    fn db_grants_become_visible_after_ttl() {
        let db = setup_db();
        let dir = AdminDirectory::new(db.clone(), &[], Duration::ZERO);
        assert!(!dir.is_admin("ops@example.com"));

        db.set_admin_access("Ops@Example.com", true).unwrap();
        assert!(dir.is_admin("ops@example.com"));

        db.set_admin_access("ops@example.com", false).unwrap();
        assert!(!dir.is_admin("ops@example.com"));
    }

    #[test]
    fn revoking_a_seed_in_the_table_does_not_remove_it() {
        let db = setup_db();
        db.set_admin_access("boss@example.com", false).unwrap();
        let dir = AdminDirectory::new(
            db,
            &["boss@example.com".to_string()],
            Duration::ZERO,
        );
        assert!(dir.is_admin("boss@example.com"));
    }

    #[test]
    fn long_ttl_keeps_serving_cached_snapshot() {
        let db = setup_db();
        db.set_admin_access("ops@example.com", true).unwrap();
        let dir = AdminDirectory::new(db.clone(), &[], Duration::from_secs(3600));
        assert!(dir.is_admin("ops@example.com"));

        // Revoke; the cached snapshot still answers until the TTL expires.
        db.set_admin_access("ops@example.com", false).unwrap();
        assert!(dir.is_admin("ops@example.com"));
    }

    #[test]
    fn any_admin_checks_each_address() {
        let db = setup_db();
        db.set_admin_access("lead@example.com", true).unwrap();
        let dir = AdminDirectory::new(db, &[], Duration::ZERO);
        assert!(dir.any_admin(&[
            "other@example.com".to_string(),
            "lead@example.com".to_string()
        ]));
        assert!(!dir.any_admin(&["other@example.com".to_string()]));
    }
}
