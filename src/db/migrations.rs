use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; entry `n` upgrades `user_version` n to n + 1.
const MIGRATIONS: &[(&str, &str)] = &[("schema_v1.sql", include_str!("schemas/schema_v1.sql"))];

const CURRENT_SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Bring the schema up to date inside one transaction.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let found: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if found > CURRENT_SCHEMA_VERSION {
        bail!("database schema v{found} is newer than this build (v{CURRENT_SCHEMA_VERSION})");
    }
    let pending = MIGRATIONS.iter().skip(usize::try_from(found).unwrap_or(0));
    if found == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;
    for (name, script) in pending {
        tx.execute_batch(script)
            .with_context(|| format!("failed to apply {name}"))?;
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to record schema version")?;
    tx.commit().context("failed to commit migrations")
}
