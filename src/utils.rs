use crate::error::ExportError;
use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;
use eyre::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ISO_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub db_path: PathBuf,
    /// Template the per-channel output paths are derived from. Never modified.
    pub output_template: PathBuf,
    pub channel_ids: Vec<String>,
    pub id_as_name: bool,
    pub mapping: MappingOptions,
}

/// How stored rows become output records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MappingOptions {
    pub timestamp_mode: TimestampMode,
    pub user_resolution: UserResolution,
    pub time_zone: TimeZone,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TimestampMode {
    /// Pass the stored epoch-millisecond text through untouched.
    Raw,
    /// Render as `YYYY-MM-DDTHH:MM:SS.fff±HH:MM`.
    #[default]
    IsoFormatted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum UserResolution {
    /// A message whose sender has no user row aborts the run.
    Strict,
    /// Unknown senders get a null author name, discriminator and avatar.
    #[default]
    Lenient,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TimeZone {
    #[default]
    Utc,
    Local,
}

/// Settings read from `config.toml`. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub id_as_name: Option<bool>,
    pub timestamp_mode: Option<TimestampMode>,
    pub user_resolution: Option<UserResolution>,
    pub time_zone: Option<TimeZone>,
}

/// What was given on the command line; `None` means "not given".
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub db_path: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub id_as_name: bool,
    pub channel: Option<String>,
    pub timestamp_mode: Option<TimestampMode>,
    pub user_resolution: Option<UserResolution>,
    pub time_zone: Option<TimeZone>,
}

/// Load the config file: the explicit path if given (it must exist), else
/// `$XDG_CONFIG_HOME/chat-db-export/config.toml` when present.
pub fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(ExportError::Configuration(format!(
                "config file not found: {}",
                p.display()
            ))
            .into());
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("chat-db-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

/// Merge CLI > config file > built-in defaults. Channel ids only come from the CLI.
pub fn resolve_config(cli: CliOverrides, file: FileConfig) -> Result<ExportConfig, ExportError> {
    let raw_channels = cli
        .channel
        .ok_or_else(|| ExportError::Configuration("channel id is required (--channel)".into()))?;
    let channel_ids = parse_channel_ids(&raw_channels)?;

    let mapping = MappingOptions {
        timestamp_mode: cli.timestamp_mode.or(file.timestamp_mode).unwrap_or_default(),
        user_resolution: cli.user_resolution.or(file.user_resolution).unwrap_or_default(),
        time_zone: cli.time_zone.or(file.time_zone).unwrap_or_default(),
    };

    Ok(ExportConfig {
        db_path: cli
            .db_path
            .or(file.db_path)
            .unwrap_or_else(|| PathBuf::from("input.db")),
        output_template: cli
            .out
            .or(file.out)
            .unwrap_or_else(|| PathBuf::from("output.json")),
        channel_ids,
        id_as_name: cli.id_as_name || file.id_as_name.unwrap_or(false),
        mapping,
    })
}

/// Split a comma-separated channel list.
///
/// Entries keep their position, so an id's index (and its `out<N>.json`
/// name) is where it sits in the list. Blank entries stay in place and are
/// skipped by the export loop. Ids are not trimmed.
pub fn parse_channel_ids(raw: &str) -> Result<Vec<String>, ExportError> {
    let ids: Vec<String> = raw.split(',').map(str::to_string).collect();

    if ids.iter().all(|id| id.is_empty()) {
        return Err(ExportError::Configuration(
            "at least one channel id is required (--channel A,B,...)".into(),
        ));
    }
    Ok(ids)
}

/// Output path for the `index`-th channel.
///
/// With `id_as_name` the path is exactly `<channel_id>.json`, relative to the
/// working directory, and the template is ignored. Otherwise the index is
/// spliced between the template's stem and extension
/// (`out.json` -> `out0.json`, `out1.json`, ...).
pub fn output_path_for(template: &Path, index: usize, channel_id: &str, id_as_name: bool) -> PathBuf {
    if id_as_name {
        return PathBuf::from(format!("{channel_id}.json"));
    }

    let dir = template.parent().unwrap_or_else(|| Path::new(""));
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let name = match template.extension() {
        Some(ext) => format!("{}{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}{}", stem, index),
    };
    dir.join(name)
}

/// Render a stored epoch-millisecond timestamp according to `options`.
pub fn format_timestamp(
    raw: &str,
    message_id: &str,
    options: MappingOptions,
) -> Result<String, ExportError> {
    if options.timestamp_mode == TimestampMode::Raw {
        return Ok(raw.to_string());
    }

    let malformed = || ExportError::MalformedTimestamp {
        message_id: message_id.to_string(),
        value: raw.to_string(),
    };
    let millis: i64 = raw.parse().map_err(|_| malformed())?;
    let instant = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(malformed)?;

    Ok(match options.time_zone {
        TimeZone::Utc => instant.format(ISO_MILLIS).to_string(),
        TimeZone::Local => instant.with_timezone(&Local).format(ISO_MILLIS).to_string(),
    })
}
