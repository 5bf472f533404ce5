//! Rotating file sink
//!
//! The active file always lives at the configured path. When a write would push
//! it past the size limit, it is retired to `<path>.1`, older retired files
//! move up by one (`.1` to `.2` and so on) and the oldest beyond the retention
//! cap is deleted. Retired files may be gzip-compressed, in which case they
//! carry an extra `.gz` suffix.

use crate::core::{LogMessage, LoggerError, Result, Sink};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// When and how the active file is retired
///
/// # Examples
///
/// ```
/// use blogger::sinks::RotationPolicy;
///
/// // 1 MiB per file, the active one plus four retired, compressed
/// let policy = RotationPolicy::new()
///     .with_max_bytes(Some(1024 * 1024))
///     .with_max_files(5)
///     .with_compression(true);
///
/// assert_eq!(policy.max_retired(), Some(4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size limit of the active file; `None` never rotates
    pub max_bytes: Option<u64>,
    /// Files kept, counting the active one; 0 keeps every retired file
    pub max_files: usize,
    /// With rotation off the size limit is ignored
    pub rotate: bool,
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: None,
            max_files: 0,
            rotate: true,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotation(mut self, rotate: bool) -> Self {
        self.rotate = rotate;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// How many retired files may exist, `None` if unbounded
    #[must_use]
    pub fn max_retired(&self) -> Option<usize> {
        match self.max_files {
            0 => None,
            n => Some(n - 1),
        }
    }
}

/// File sink with size-based rotation
///
/// The active file is locked exclusively for as long as the sink has it open;
/// a second sink on the same path fails to open.
///
/// # Examples
///
/// ```no_run
/// use blogger::sinks::{RotatingFileSink, RotationPolicy};
///
/// let policy = RotationPolicy::new()
///     .with_max_bytes(Some(10 * 1024 * 1024))
///     .with_max_files(7);
/// let sink = RotatingFileSink::open("/var/log/app.log", policy).unwrap();
/// ```
pub struct RotatingFileSink {
    path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Consecutive rotations that could not delete the oldest retired file
    deletion_failure_count: usize,
}

impl RotatingFileSink {
    /// Open (or create) the active file at `path` in append mode
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created, or if
    /// another sink holds the file's lock
    pub fn open<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (writer, current_size) = Self::open_active(&path)?;

        Ok(Self {
            path,
            policy,
            writer: Some(writer),
            current_size,
            deletion_failure_count: 0,
        })
    }

    fn open_active(path: &Path) -> Result<(BufWriter<File>, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        FileExt::try_lock_exclusive(&file)
            .map_err(|_| LoggerError::file_lock(path.display().to_string()))?;

        let size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        Ok((BufWriter::new(file), size))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Bytes in the active file, including buffered ones
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Whether the active file is currently open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Retired files on disk, newest first
    pub fn retired_files(&self) -> Vec<PathBuf> {
        self.retired_indices()
            .into_iter()
            .filter_map(|index| self.existing_retired(index))
            .collect()
    }

    /// Indices of every `<path>.N` or `<path>.N.gz` in the log directory,
    /// ascending. Missing indices in between do not end the scan.
    fn retired_indices(&self) -> Vec<usize> {
        let Some(name) = self.path.file_name().and_then(|n| n.to_str()) else {
            return (1..)
                .take_while(|&index| self.existing_retired(index).is_some())
                .collect();
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Cannot list retired log files in {}: {}",
                    dir.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut indices: Vec<usize> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name();
                let suffix = file_name.to_str()?.strip_prefix(name)?.strip_prefix('.')?;
                let digits = suffix.strip_suffix(".gz").unwrap_or(suffix);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok().filter(|&index| index > 0)
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    fn retired_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn compressed(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    }

    /// Retired file `index` as found on disk, plain or compressed
    fn existing_retired(&self, index: usize) -> Option<PathBuf> {
        let plain = self.retired_path(index);
        if plain.exists() {
            return Some(plain);
        }
        let gz = Self::compressed(&plain);
        gz.exists().then_some(gz)
    }

    fn should_rotate(&self, incoming: u64) -> bool {
        if !self.policy.rotate || self.current_size == 0 {
            return false;
        }
        self.policy
            .max_bytes
            .is_some_and(|max| self.current_size + incoming > max)
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
            // Dropping the writer closes the file and releases its lock
        }

        match self.policy.max_retired() {
            Some(0) => {
                fs::remove_file(&self.path).map_err(|e| {
                    LoggerError::file_rotation(
                        self.path.display().to_string(),
                        format!("Failed to discard full log file: {}", e),
                    )
                })?;
            }
            cap => {
                // Anything at or past the cap would end up beyond it after the shift
                let mut kept = Vec::new();
                for index in self.retired_indices() {
                    if cap.is_some_and(|cap| index >= cap) {
                        self.remove_retired(index)?;
                    } else {
                        kept.push(index);
                    }
                }

                for &index in kept.iter().rev() {
                    self.shift_retired(index)?;
                }

                let retired = self.retired_path(1);
                fs::rename(&self.path, &retired).map_err(|e| {
                    LoggerError::file_rotation(
                        self.path.display().to_string(),
                        format!("Failed to retire current log file: {}", e),
                    )
                })?;

                if self.policy.compress {
                    compress_file(&retired)?;
                }
            }
        }

        let (writer, size) = Self::open_active(&self.path)?;
        self.writer = Some(writer);
        self.current_size = size;

        Ok(())
    }

    fn remove_retired(&mut self, index: usize) -> Result<()> {
        const MAX_DELETION_FAILURES: usize = 5;

        let Some(oldest) = self.existing_retired(index) else {
            return Ok(());
        };

        match fs::remove_file(&oldest) {
            Ok(()) => {
                self.deletion_failure_count = 0;
                Ok(())
            }
            Err(e) => {
                self.deletion_failure_count += 1;
                eprintln!(
                    "[LOGGER WARNING] Failed to remove oldest log file {}: {} (failure #{}/{})",
                    oldest.display(),
                    e,
                    self.deletion_failure_count,
                    MAX_DELETION_FAILURES
                );
                if self.deletion_failure_count >= MAX_DELETION_FAILURES {
                    return Err(LoggerError::file_rotation(
                        self.path.display().to_string(),
                        format!(
                            "Rotation aborted: failed to delete old log files {} consecutive times",
                            self.deletion_failure_count
                        ),
                    ));
                }
                Ok(())
            }
        }
    }

    fn shift_retired(&self, index: usize) -> Result<()> {
        let Some(from) = self.existing_retired(index) else {
            return Ok(());
        };
        let mut to = self.retired_path(index + 1);
        if from.extension().is_some_and(|ext| ext == "gz") {
            to = Self::compressed(&to);
        }

        fs::rename(&from, &to).map_err(|e| {
            LoggerError::file_rotation(
                from.display().to_string(),
                format!("Failed to shift retired log file: {}", e),
            )
        })
    }

    /// Bring the sink back after a failure; used before every write while inert
    fn reopen(&mut self) -> Result<()> {
        let (writer, size) = Self::open_active(&self.path)?;
        self.writer = Some(writer);
        self.current_size = size;
        Ok(())
    }
}

/// Gzip `path` into `<path>.gz`, removing the original only once the
/// compressed copy is complete
fn compress_file(path: &Path) -> Result<()> {
    use flate2::{write::GzEncoder, Compression};
    use std::io::BufReader;

    let gz_path = RotatingFileSink::compressed(path);
    let mut temp_name = gz_path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let cleanup = |e: std::io::Error, what: &str| {
        let _ = fs::remove_file(&temp_path);
        LoggerError::io_operation("compress log file", what.to_string(), e)
    };

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary compressed file: {}", temp_path.display()),
            e,
        )
    })?;
    let mut encoder = GzEncoder::new(BufWriter::with_capacity(64 * 1024, output), Compression::default());

    std::io::copy(&mut reader, &mut encoder).map_err(|e| cleanup(e, "Failed to compress data"))?;
    encoder
        .finish()
        .and_then(|mut out| out.flush())
        .map_err(|e| cleanup(e, "Failed to finish compression"))?;

    fs::rename(&temp_path, &gz_path)
        .map_err(|e| cleanup(e, &format!("Failed to rename compressed file to: {}", gz_path.display())))?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed {} but could not remove the original: {}",
            path.display(),
            e
        );
    }

    Ok(())
}

impl Sink for RotatingFileSink {
    fn write(&mut self, message: &LogMessage<'_>) -> Result<()> {
        if self.writer.is_none() {
            self.reopen()?;
        }

        let bytes = message.as_bytes();
        if self.should_rotate(bytes.len() as u64) {
            if let Err(e) = self.rotate() {
                eprintln!("[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.", e);

                if self.writer.is_none() {
                    self.reopen()?;
                }

                // Let the file grow past the limit rather than retry on every write
                self.current_size = 0;
            }
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File writer not initialized"))?;

        if let Err(e) = writer.write_all(bytes) {
            // Drop the handle; the next write reopens the file
            self.writer = None;
            return Err(LoggerError::file_sink(
                self.path.display().to_string(),
                format!("Failed to write log entry: {}", e),
            ));
        }
        self.current_size += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(self.path.display().to_string(), format!("Failed to flush: {}", e))
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rotating_file"
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}
