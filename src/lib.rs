//! # chat-db-export
//!
//! A CLI tool that exports direct-message channels from a chat SQLite database
//! into the JSON format used by chat-export viewers.
//!
//! ## What it does
//!
//! For every requested channel id the tool reads the channel's messages (with
//! their edit times and the channel name), resolves each sender against the
//! `users` table, and writes one JSON document containing a fixed
//! "Direct Messages" guild, the channel metadata and the messages.
//!
//! The database is opened **read-only**, your data is never modified. Output
//! files are written to a temporary file first and renamed into place.
//!
//! ## Usage
//!
//! ```sh
//! # One file per channel, named out0.json, out1.json, ...
//! chat-db-export --in chats.db --out out.json --channel 1234,5678
//!
//! # One file per channel, named after the channel id
//! chat-db-export --in chats.db --channel 1234,5678 --id-as-name
//! ```
//!
//! Preferences can be persisted in `~/.config/chat-db-export/config.toml`.
//!
//! ## Schema variants
//!
//! Timestamps are rendered as ISO-8601 with milliseconds by default
//! (`--timestamp-mode raw` keeps the stored epoch milliseconds), and
//! messages from unknown senders get a null author unless
//! `--user-resolution strict` is given, which makes them fatal.

pub mod error;
pub mod exporter;
pub mod importer;
pub mod sequential;
pub mod utils;

pub use error::ExportError;
pub use utils::ExportConfig;
