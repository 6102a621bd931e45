use std::path::Path;

use anyhow::Result;
use tokio_rusqlite::Connection;

pub mod scans;

pub async fn init(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path.to_path_buf()).await?;

    conn.call(|conn| {
        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)?;

        // Enable foreign keys (SQLite disables them by default!)
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        Ok::<(), tokio_rusqlite::rusqlite::Error>(())
    })
    .await?;

    Ok(conn)
}
