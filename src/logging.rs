//! Log sinks: console and an optional size-rotated file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Name of the log file inside the log directory.
pub const LOG_FILENAME: &str = "mangoose.log";

/// Size at which the log file is rotated to `<name>.1`.
const MAX_LOG_BYTES: u64 = 50_000;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("subscriber init failed: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Debug)]
pub struct LogOptions {
    /// Print messages to stdout.
    pub console: bool,
    /// Directory for the log file; `None` disables file logging.
    pub file_dir: Option<PathBuf>,
    /// Show debug messages on the console.
    pub verbose: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            console: true,
            file_dir: None,
            verbose: false,
        }
    }
}

/// Keeps the file writer alive; buffered lines are flushed on drop.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global subscriber with the requested sinks.
pub fn init(options: &LogOptions) -> Result<LogGuard, LogError> {
    let console_level = if options.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let console_layer = options.console.then(|| {
        fmt::layer()
            .without_time()
            .with_target(false)
            .with_level(options.verbose)
            .with_writer(io::stdout)
            .with_filter(console_level)
    });

    let (file_layer, guard) = match &options.file_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = SizeRotatingFile::open(dir.join(LOG_FILENAME), MAX_LOG_BYTES)?;
            let (writer, guard) = non_blocking::NonBlockingBuilder::default()
                .lossy(false)
                .finish(appender);
            let layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(LevelFilter::INFO);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(LogGuard { _file: guard })
}

/// Append-only log file that moves itself to `<name>.1` when a write
/// would take it past `max_bytes`. One backup is kept.
struct SizeRotatingFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
    max_bytes: u64,
}

impl SizeRotatingFile {
    fn open(path: PathBuf, max_bytes: u64) -> io::Result<Self> {
        rotate_if_large(&path, max_bytes)?;
        let file = append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file: Some(file),
            written,
            max_bytes,
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        // Closed before the rename so it also works where open files can't move
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        fs::rename(&self.path, backup_path(&self.path))?;
        self.file = Some(append(&self.path)?);
        self.written = 0;
        Ok(())
    }
}

impl Write for SizeRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        // A failed rotation leaves no open file; try again here
        let file = match self.file.take() {
            Some(file) => file,
            None => append(&self.path)?,
        };
        let file = self.file.insert(file);
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(log: &Path) -> PathBuf {
    let mut backup = log.as_os_str().to_os_string();
    backup.push(".1");
    PathBuf::from(backup)
}

/// Moves `log` to `<log>.1` once it reaches `max_bytes`, replacing any
/// previous backup. Returns true if the file was rotated.
fn rotate_if_large(log: &Path, max_bytes: u64) -> io::Result<bool> {
    let Ok(meta) = fs::metadata(log) else {
        return Ok(false);
    };
    if meta.len() < max_bytes {
        return Ok(false);
    }

    fs::rename(log, backup_path(log))?;
    Ok(true)
}
