//! The export loop: one channel at a time, query -> map -> assemble -> write.

use crate::error::ExportError;
use crate::exporter::{self, ExportDocument};
use crate::importer::{self, ChannelMessages};
use crate::utils::{ExportConfig, MappingOptions, output_path_for};
use eyre::{Context, Result};
use rusqlite::Connection;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// The main entry point for the export logic.
/// Returns the written paths, in channel order. The first error aborts the run.
/// Blank ids are skipped but still use up their index.
pub fn execute(config: &ExportConfig) -> Result<Vec<PathBuf>> {
    if config.channel_ids.iter().all(|id| id.is_empty()) {
        return Err(ExportError::Configuration("channel id is required".into()).into());
    }

    info!("Opening database...");
    let conn = importer::open_db(&config.db_path)?;

    let mut written = Vec::with_capacity(config.channel_ids.len());
    for (index, channel_id) in config.channel_ids.iter().enumerate() {
        if channel_id.is_empty() {
            warn!("Skipping blank channel id at position {index}");
            continue;
        }
        let path = output_path_for(
            &config.output_template,
            index,
            channel_id,
            config.id_as_name,
        );
        export_channel(&conn, channel_id, &path, config.mapping)
            .wrap_err_with(|| format!("Failed to export channel {channel_id}"))?;
        info!("Done with channel: {channel_id}");
        written.push(path);
    }

    Ok(written)
}

fn export_channel(
    conn: &Connection,
    channel_id: &str,
    path: &Path,
    options: MappingOptions,
) -> Result<(), ExportError> {
    info!("Getting messages from database...");
    let fetched = importer::fetch_channel(conn, channel_id)?;
    debug!(
        channel = channel_id,
        messages = fetched.messages.len(),
        "fetched channel"
    );

    let doc = build_document(conn, channel_id, fetched, options)?;

    info!("Writing to file...");
    persist_document(path, &doc)
}

/// Map every fetched message, resolving each sender, and wrap the records up.
/// Nothing is written until every message mapped cleanly.
pub fn build_document(
    conn: &Connection,
    channel_id: &str,
    fetched: ChannelMessages,
    options: MappingOptions,
) -> Result<ExportDocument, ExportError> {
    let mut records = Vec::with_capacity(fetched.messages.len());
    for msg in &fetched.messages {
        let user = importer::find_user(conn, &msg.sender_id)?;
        if user.is_none() {
            debug!(sender = %msg.sender_id, message = %msg.message_id, "no user row for sender");
        }
        records.push(exporter::map_message(msg, user.as_ref(), options)?);
    }

    info!("Formatting JSON...");
    Ok(exporter::assemble_document(channel_id, &fetched.name, records))
}

/// Write `doc` next to `path` in a temporary file, then move it into place.
pub fn persist_document(path: &Path, doc: &ExportDocument) -> Result<(), ExportError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = output_temp_file(dir).map_err(ExportError::io(path))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        exporter::write_document(&mut writer, doc).map_err(ExportError::io(path))?;
        writer.flush().map_err(ExportError::io(path))?;
    }
    tmp.persist(path)
        .map_err(|e| ExportError::io(path)(e.error))?;
    Ok(())
}

/// A temp file that ends up with the same mode a plain `File::create` would
/// give (0o666 minus the umask), rather than tempfile's private 0o600.
fn output_temp_file(dir: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".chat-db-export").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}
