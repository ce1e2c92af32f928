//! Read side of the export: the chat database schema and the queries run against it.
//!
//! The database is only ever read. Expected tables:
//! ```sql
//! CREATE TABLE messages (
//!     message_id TEXT,
//!     sender_id  TEXT,
//!     channel_id TEXT,
//!     text       TEXT,
//!     timestamp  TEXT    -- epoch milliseconds
//! );
//! CREATE TABLE edit_timestamps (message_id TEXT, edit_timestamp TEXT);
//! CREATE TABLE channels (id TEXT, name TEXT);
//! CREATE TABLE users (id TEXT, name TEXT, avatar_url TEXT, discriminator TEXT);
//! ```
//!
//! Columns are cast to text in SQL so databases that store ids or
//! timestamps as integers are read the same way.
use crate::error::ExportError;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::Path;

const CHANNEL_MESSAGES_SQL: &str = r#"
    SELECT
        CAST(m.message_id AS TEXT),
        CAST(m.sender_id AS TEXT),
        COALESCE(m.text, ''),
        CAST(m.timestamp AS TEXT),
        COALESCE(CAST(e.edit_timestamp AS TEXT), ''),
        COALESCE(c.name, '')
    FROM messages m
    LEFT JOIN edit_timestamps e ON m.message_id = e.message_id
    LEFT JOIN channels c ON m.channel_id = c.id
    WHERE m.channel_id = ?1
"#;

/// A message row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub message_id: String,
    pub sender_id: String,
    pub content: String,
    /// Epoch milliseconds, as text.
    pub timestamp: String,
    /// Empty when the message was never edited.
    pub edit_timestamp: String,
}

/// A row of the `users` table, looked up by id. Any column may be NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub discriminator: Option<String>,
}

/// Everything fetched for one channel id.
#[derive(Debug, Clone, Default)]
pub struct ChannelMessages {
    /// Empty when no `channels` row matches.
    pub name: String,
    /// In storage iteration order.
    pub messages: Vec<StoredMessage>,
}

pub fn open_db(path: &Path) -> Result<Connection, ExportError> {
    if !path.exists() {
        return Err(ExportError::Storage {
            context: format!("database not found at {}", path.display()),
            source: rusqlite::Error::InvalidPath(path.to_path_buf()),
        });
    }

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(ExportError::storage(format!(
        "failed to open database {}",
        path.display()
    )))
}

/// Fetch every message of `channel_id`, joined with its edit time and the channel name.
pub fn fetch_channel(conn: &Connection, channel_id: &str) -> Result<ChannelMessages, ExportError> {
    let mut stmt = conn
        .prepare_cached(CHANNEL_MESSAGES_SQL)
        .map_err(ExportError::storage("failed to prepare message query"))?;

    let mut rows = stmt
        .query(params![channel_id])
        .map_err(ExportError::storage("failed to execute message query"))?;

    let mut name: Option<String> = None;
    let mut messages = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(ExportError::storage("failed to read message row"))?
    {
        let read = || -> rusqlite::Result<(StoredMessage, String)> {
            Ok((
                StoredMessage {
                    message_id: row.get(0)?,
                    sender_id: row.get(1)?,
                    content: row.get(2)?,
                    timestamp: row.get(3)?,
                    edit_timestamp: row.get(4)?,
                },
                row.get(5)?,
            ))
        };
        let (message, channel_name) =
            read().map_err(ExportError::storage("failed to decode message row"))?;
        if name.is_none() {
            name = Some(channel_name);
        }
        messages.push(message);
    }

    let name = match name {
        Some(name) => name,
        None => channel_name(conn, channel_id)?.unwrap_or_default(),
    };

    Ok(ChannelMessages { name, messages })
}

/// Name of a channel looked up directly, for channels without messages.
pub fn channel_name(conn: &Connection, channel_id: &str) -> Result<Option<String>, ExportError> {
    conn.query_row(
        "SELECT COALESCE(name, '') FROM channels WHERE id = ?1",
        params![channel_id],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(ExportError::storage("failed to look up channel name"))
}

pub fn find_user(conn: &Connection, user_id: &str) -> Result<Option<User>, ExportError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT name, avatar_url, CAST(discriminator AS TEXT) FROM users WHERE id = ?1",
        )
        .map_err(ExportError::storage("failed to prepare user query"))?;

    stmt.query_row(params![user_id], |row| {
        Ok(User {
            display_name: row.get(0)?,
            avatar_url: row.get(1)?,
            discriminator: row.get(2)?,
        })
    })
    .optional()
    .map_err(ExportError::storage(format!("failed to look up user {user_id}")))
}
