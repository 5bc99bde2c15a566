//! Admin allow-list storage.

use super::Database;
use anyhow::Result;
use rusqlite::params;

impl Database {
    /// Addresses with access granted, lowercased and sorted.
    pub fn admin_emails(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT lower(email) FROM admin_access WHERE access != 0 ORDER BY email",
            )?;
            let emails = stmt
                .query_map([], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            Ok(emails)
        })
    }

    /// Grant or revoke access for one address. The row is kept on revoke so
    /// the grant history stays visible in the table.
    pub fn set_admin_access(&self, email: &str, access: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admin_access (email, access) VALUES (lower(?1), ?2)
                 ON CONFLICT (email) DO UPDATE SET access = excluded.access",
                params![email, access as i64],
            )?;
            Ok(())
        })
    }
}
