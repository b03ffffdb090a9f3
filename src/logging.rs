use crate::config::LogConfig;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub fn init(cfg: &LogConfig) -> io::Result<()> {
    let file_writer = RotatingWriter::new(&cfg.path, cfg.max_bytes, cfg.backup_count)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .event_format(LineFormat)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(
            fmt::layer()
                .event_format(LineFormat)
                .with_ansi(false)
                .with_writer(io::stdout),
        )
        .init();

    Ok(())
}

/// Renders every record as `<timestamp> - <LEVEL> - <message>` on one line.
#[derive(Debug, Clone, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let timestamp = humantime::format_rfc3339_seconds(SystemTime::now());
        write!(
            writer,
            "{timestamp} - {} - ",
            level_label(event.metadata().level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_label(level: &Level) -> &'static str {
    if *level == Level::ERROR {
        "ERROR"
    } else if *level == Level::WARN {
        "WARNING"
    } else if *level == Level::INFO {
        "INFO"
    } else if *level == Level::DEBUG {
        "DEBUG"
    } else {
        "TRACE"
    }
}

/// Size-capped append-only log file. Once a record would push the active file
/// past `max_bytes`, backups shift (`log.1` -> `log.2`, ...) with the oldest
/// discarded, the active file becomes `log.1`, and writing resumes on a fresh
/// file. A single record larger than the cap is written whole. With
/// `backup_count == 0` rollover never occurs and the file grows unbounded.
pub struct RotatingWriter {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    file: File,
    len: u64,
}

impl RotatingWriter {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, backup_count: usize) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            backup_count,
            inner: Mutex::new(Inner { file, len }),
        })
    }

    fn write_record(&self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if self.backup_count > 0 && inner.len > 0 && inner.len + buf.len() as u64 > self.max_bytes
        {
            self.rotate(&mut inner)?;
        }
        inner.file.write_all(buf)?;
        inner.file.flush()?;
        inner.len += buf.len() as u64;
        Ok(buf.len())
    }

    fn rotate(&self, inner: &mut Inner) -> io::Result<()> {
        inner.file.flush()?;
        let oldest = backup_path(&self.path, self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backup_count).rev() {
            let from = backup_path(&self.path, index);
            if from.exists() {
                fs::rename(&from, backup_path(&self.path, index + 1))?;
            }
        }
        fs::rename(&self.path, backup_path(&self.path, 1))?;
        inner.file = open_append(&self.path)?;
        inner.len = 0;
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingHandle<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingHandle(self)
    }
}

pub struct RotatingHandle<'a>(&'a RotatingWriter);

impl io::Write for RotatingHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_record(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn file_len(path: &Path) -> u64 {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    #[test]
    fn appends_until_limit_would_be_exceeded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("monitor.log");
        let writer = RotatingWriter::new(&path, 100, 3).expect("writer");

        let record = [b'x'; 40];
        writer.write_record(&record).expect("first");
        writer.write_record(&record).expect("second");

        assert_eq!(file_len(&path), 80);
        assert!(!backup_path(&path, 1).exists());
    }

    #[test]
    fn rotates_before_crossing_the_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("monitor.log");
        let writer = RotatingWriter::new(&path, 100, 3).expect("writer");

        let record = [b'x'; 40];
        for _ in 0..3 {
            writer.write_record(&record).expect("write");
        }

        assert_eq!(file_len(&path), 40);
        assert_eq!(file_len(&backup_path(&path, 1)), 80);
    }

    #[test]
    fn keeps_at_most_backup_count_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("monitor.log");
        let writer = RotatingWriter::new(&path, 10, 2).expect("writer");

        for index in 0..6u8 {
            let record = [b'0' + index; 8];
            writer.write_record(&record).expect("write");
        }

        assert!(path.exists());
        assert!(backup_path(&path, 1).exists());
        assert!(backup_path(&path, 2).exists());
        assert!(!backup_path(&path, 3).exists());

        // Newest backup holds the record written just before the active file.
        let newest = fs::read(backup_path(&path, 1)).expect("read backup");
        assert_eq!(newest, vec![b'4'; 8]);
        let oldest = fs::read(backup_path(&path, 2)).expect("read backup");
        assert_eq!(oldest, vec![b'3'; 8]);
    }

    #[test]
    fn zero_backup_count_never_rotates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("monitor.log");
        let writer = RotatingWriter::new(&path, 10, 0).expect("writer");

        writer.write_record(&[b'a'; 8]).expect("write");
        writer.write_record(&[b'b'; 8]).expect("write");
        writer.write_record(&[b'c'; 8]).expect("write");

        assert_eq!(file_len(&path), 24);
        assert!(!backup_path(&path, 1).exists());
    }

    #[test]
    fn oversized_record_is_written_whole() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("monitor.log");
        let writer = RotatingWriter::new(&path, 10, 3).expect("writer");

        writer.write_record(&[b'x'; 25]).expect("write");
        assert_eq!(file_len(&path), 25);

        writer.write_record(&[b'y'; 5]).expect("write");
        assert_eq!(file_len(&path), 5);
        assert_eq!(file_len(&backup_path(&path, 1)), 25);
    }

    #[test]
    fn resumes_from_existing_file_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("monitor.log");
        fs::write(&path, [b'x'; 90]).expect("seed");

        let writer = RotatingWriter::new(&path, 100, 3).expect("writer");
        writer.write_record(&[b'y'; 40]).expect("write");

        assert_eq!(file_len(&path), 40);
        assert_eq!(file_len(&backup_path(&path, 1)), 90);
    }

    #[test]
    fn warn_maps_to_warning_label() {
        assert_eq!(level_label(&Level::WARN), "WARNING");
        assert_eq!(level_label(&Level::INFO), "INFO");
        assert_eq!(level_label(&Level::ERROR), "ERROR");
    }

    #[test]
    fn records_use_timestamp_level_message_shape() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("monitor.log");
        let writer = RotatingWriter::new(&path, 1024, 3).expect("writer");

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .event_format(LineFormat)
                .with_ansi(false)
                .with_writer(writer),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("CPU usage: 12.5%");
            tracing::warn!("High memory usage: 91.0% (Threshold: 80%)");
        });

        let text = fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - INFO - CPU usage: 12.5%"));
        assert!(lines[1].ends_with(" - WARNING - High memory usage: 91.0% (Threshold: 80%)"));
        // Timestamps parse back as RFC3339.
        let stamp = lines[0].split(" - ").next().expect("timestamp");
        humantime::parse_rfc3339(stamp).expect("valid timestamp");
    }
}
