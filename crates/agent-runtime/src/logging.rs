//! Logging
//!
//! `RotatingFileSink` is an append-only log file with an explicit
//! lifecycle: `open`, `write` (via `std::io::Write`), `close`. Once the
//! current file reaches `max_bytes`, the next write starts a fresh
//! timestamped file. The sink is a cheap handle and doubles as the
//! `MakeWriter` for a `tracing-subscriber` fmt layer.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log sink settings
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Directory that receives the log files
    pub dir: PathBuf,

    /// File name prefix
    pub prefix: String,

    /// Size at which a new file is started
    pub max_bytes: u64,

    /// Mirror log lines to stderr
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            prefix: "weather-client".into(),
            max_bytes: 5 * 1024 * 1024,
            console: false,
        }
    }
}

struct SinkState {
    dir: PathBuf,
    prefix: String,
    max_bytes: u64,
    path: PathBuf,
    file: Option<File>,
    written: u64,
}

impl SinkState {
    fn next_path(dir: &Path, prefix: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
        let mut path = dir.join(format!("{prefix}-{stamp}.log"));
        let mut n = 1;
        while path.exists() {
            path = dir.join(format!("{prefix}-{stamp}-{n}.log"));
            n += 1;
        }
        path
    }

    fn open_file(path: &Path) -> io::Result<(File, u64)> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();
        Ok((file, len))
    }

    fn write_raw(&mut self, buf: &[u8]) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
            self.written += buf.len() as u64;
        }
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut old) = self.file.take() {
            old.flush()?;
        }
        let path = Self::next_path(&self.dir, &self.prefix);
        let (file, len) = Self::open_file(&path)?;
        self.path = path;
        self.file = Some(file);
        self.written = len;
        self.write_raw(b"Log file rotated from previous file due to size limit\n")
    }
}

/// Size-rotating append-only log file
#[derive(Clone)]
pub struct RotatingFileSink {
    state: Arc<Mutex<SinkState>>,
}

impl std::fmt::Debug for RotatingFileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RotatingFileSink")
            .field("path", &state.path)
            .field("open", &state.file.is_some())
            .finish()
    }
}

impl RotatingFileSink {
    /// Create the log directory and the first file
    pub fn open(config: &LogConfig) -> io::Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        let path = SinkState::next_path(&config.dir, &config.prefix);
        let (file, written) = SinkState::open_file(&path)?;

        let mut state = SinkState {
            dir: config.dir.clone(),
            prefix: config.prefix.clone(),
            max_bytes: config.max_bytes.max(1),
            path,
            file: Some(file),
            written,
        };
        let header = format!("Logger initialized. Logs will be saved to: {}\n", state.path.display());
        state.write_raw(header.as_bytes())?;

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// File currently written to
    pub fn current_path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    pub fn is_open(&self) -> bool {
        self.lock().file.is_some()
    }

    /// Flush and release the file. Later writes are discarded.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.lock();
        if let Some(mut file) = state.file.take() {
            file.flush()?;
        }
        Ok(())
    }
}

impl Write for RotatingFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if state.file.is_none() {
            return Ok(buf.len());
        }
        if state.written >= state.max_bytes {
            state.rotate()?;
        }
        state.write_raw(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock().file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RotatingFileSink {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber writing to `sink` (and stderr if `console`)
pub fn init_tracing(sink: &RotatingFileSink, console: bool, default_filter: &str) -> anyhow::Result<()> {
    let file_layer = fmt::layer().with_ansi(false).with_writer(sink.clone());
    let console_layer = console.then(|| fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(file_layer)
        .with(console_layer)
        .try_init()?;
    Ok(())
}

/// Install the global subscriber writing to stderr only
pub fn init_stderr_tracing(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().with_writer(io::stderr))
        .try_init()?;
    Ok(())
}
