//! Rolling file logs for the record store.
//!
//! # Responsibility
//! - Start one flexi_logger backend per process.
//! - Capture panics as sanitized `panic_captured` events.
//!
//! # Invariants
//! - A repeated `init_logging` with an equal [`LogConfig`] is a no-op.
//! - A repeated `init_logging` with a different config is an error, never a
//!   silent switch.
//! - Nothing here panics.
//! - Events carry metadata only; site names, notes and annotation text stay
//!   out of the log files.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const FILE_BASENAME: &str = "obras";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_PAYLOAD_LIMIT: usize = 160;
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Validated logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogConfig {
    level: &'static str,
    dir: PathBuf,
}

impl LogConfig {
    fn parse(level: &str, dir: &str) -> Result<Self, String> {
        Ok(Self {
            level: parse_level(level)?,
            dir: parse_dir(dir)?,
        })
    }

    /// Explains why `requested` cannot replace `self`, if it cannot.
    fn conflict_with(&self, requested: &LogConfig) -> Option<String> {
        if self.dir != requested.dir {
            Some(format!(
                "logging already writes to `{}`; cannot move it to `{}`",
                self.dir.display(),
                requested.dir.display()
            ))
        } else if self.level != requested.level {
            Some(format!(
                "logging already runs at level `{}`; cannot change it to `{}`",
                self.level, requested.level
            ))
        } else {
            None
        }
    }
}

struct ActiveLogger {
    config: LogConfig,
    _handle: LoggerHandle,
}

/// Starts rolling file logging at `level` under the absolute `log_dir`.
///
/// # Errors
/// - Unknown level (accepted: `trace|debug|info|warn|warning|error`).
/// - Blank or relative `log_dir`, or a directory that cannot be created.
/// - Logging already started with another level or directory.
/// - The flexi_logger backend refuses to start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let requested = LogConfig::parse(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| ActiveLogger::start(requested.clone()))?;
    match active.config.conflict_with(&requested) {
        Some(message) => Err(message),
        None => Ok(()),
    }
}

/// Active `(level, log_dir)`, or `None` when logging was never started.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.config.level, active.config.dir.clone()))
}

/// Level used when the host app does not pick one.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

impl ActiveLogger {
    fn start(config: LogConfig) -> Result<Self, String> {
        std::fs::create_dir_all(&config.dir)
            .map_err(|err| format!("cannot create `{}`: {err}", config.dir.display()))?;

        let handle = Logger::try_with_str(config.level)
            .map_err(|err| format!("logger rejected level `{}`: {err}", config.level))?
            .log_to_file(
                FileSpec::default()
                    .directory(config.dir.as_path())
                    .basename(FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(ROTATE_AT_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("logger backend did not start: {err}"))?;

        if PANIC_HOOK.set(()).is_ok() {
            chain_panic_hook();
        }

        info!(
            "event=logging_start module=core status=ok os={} profile={} version={} level={} dir={}",
            std::env::consts::OS,
            if cfg!(debug_assertions) { "debug" } else { "release" },
            env!("CARGO_PKG_VERSION"),
            config.level,
            config.dir.display()
        );

        Ok(Self {
            config,
            _handle: handle,
        })
    }
}

fn parse_level(raw: &str) -> Result<&'static str, String> {
    let wanted = raw.trim().to_ascii_lowercase();
    let wanted = if wanted == "warning" { "warn".to_string() } else { wanted };
    LEVELS
        .iter()
        .copied()
        .find(|level| *level == wanted)
        .ok_or_else(|| format!("unknown log level `{wanted}`; use one of {}", LEVELS.join("|")))
}

fn parse_dir(raw: &str) -> Result<PathBuf, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("log directory is blank".to_string());
    }
    let dir = Path::new(raw);
    if dir.is_relative() {
        return Err(format!("log directory `{raw}` is not an absolute path"));
    }
    Ok(dir.to_path_buf())
}

fn chain_panic_hook() {
    let next = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let at = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=core status=error location={at} payload={}",
            one_line(&payload, PANIC_PAYLOAD_LIMIT)
        );
        next(info);
    }));
}

/// Flattens line breaks and caps `text` at `limit` chars.
fn one_line(text: &str, limit: usize) -> String {
    let flat: String = text
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect();
    if flat.chars().count() <= limit {
        return flat;
    }
    let mut capped: String = flat.chars().take(limit).collect();
    capped.push_str("...");
    capped
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, one_line, parse_dir, parse_level, LogConfig};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn levels_are_case_insensitive_and_accept_warning() {
        assert_eq!(parse_level("ERROR").unwrap(), "error");
        assert_eq!(parse_level(" warning ").unwrap(), "warn");
        let err = parse_level("verbose").unwrap_err();
        assert!(err.contains("trace|debug|info|warn|error"));
    }

    #[test]
    fn log_dir_must_be_absolute() {
        assert!(parse_dir("   ").is_err());
        let err = parse_dir("logs/obras").unwrap_err();
        assert!(err.contains("absolute"));
    }

    #[test]
    fn one_line_flattens_and_caps() {
        let flat = one_line("visit\nnotes\rhere", 8);
        assert!(!flat.contains(['\n', '\r']));
        assert_eq!(flat, "visit no...");
        assert_eq!(one_line("short", 8), "short");
    }

    #[test]
    fn equal_configs_do_not_conflict() {
        let active = LogConfig::parse("info", "/var/log/obras").unwrap();
        let same = LogConfig::parse(" INFO ", "/var/log/obras").unwrap();
        let louder = LogConfig::parse("debug", "/var/log/obras").unwrap();
        assert_eq!(active.conflict_with(&same), None);
        assert!(active.conflict_with(&louder).is_some());
    }

    #[test]
    fn repeated_init_is_idempotent_and_rejects_changes() {
        let log_dir = scratch_dir("idempotent");
        let other_dir = scratch_dir("other");
        let log_dir_str = log_dir.to_str().expect("utf-8 temp dir");
        let other_dir_str = other_dir.to_str().expect("utf-8 temp dir");

        init_logging("info", log_dir_str).expect("first init should succeed");
        init_logging("INFO", log_dir_str).expect("same config should be idempotent");

        let level_err = init_logging("debug", log_dir_str).expect_err("level conflict");
        assert!(level_err.contains("cannot change"));
        let dir_err = init_logging("info", other_dir_str).expect_err("directory conflict");
        assert!(dir_err.contains("cannot move"));

        let (level, dir) = logging_status().expect("logging should be active");
        assert_eq!(level, "info");
        assert_eq!(dir, log_dir);
    }

    // The global logger outlives this test, so the directory is not removed.
    fn scratch_dir(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "obras-logging-{suffix}-{}-{nanos}",
            std::process::id()
        ))
    }
}
