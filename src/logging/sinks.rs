use std::{
    fs::File,
    io::{LineWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use eyre::Context;

use super::LogSink;

fn lock<T>(mutex: &Mutex<T>) -> eyre::Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|e| eyre::eyre!(e.to_string()))
}

fn open_append(path: &Path) -> eyre::Result<File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed opening or creating log file {}", path.display()))
}

pub struct FileSink {
    file: Mutex<LineWriter<File>>,
    file_path: PathBuf,
    max_file_size: Option<u64>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> eyre::Result<Self> {
        let file_path = path.into();
        let file = open_append(&file_path)?;

        Ok(Self {
            file: Mutex::new(LineWriter::new(file)),
            file_path,
            max_file_size: None,
        })
    }

    /// Rotate the file to `<path>.old` (then `.old1`, `.old2`, ...) once it
    /// grows past `max_file_size` bytes.
    pub fn with_max_file_size(self, max_file_size: u64) -> Self {
        Self {
            max_file_size: Some(max_file_size),
            ..self
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn rotate_if_exceeds_max_file_size(&self, file: &mut LineWriter<File>) -> eyre::Result<()> {
        let Some(max_file_size) = self.max_file_size else {
            return Ok(());
        };

        let md = file
            .get_ref()
            .metadata()
            .context("Can't read log file metadata")?;

        if md.len() <= max_file_size {
            return Ok(());
        }

        file.flush().context("Can't flush file")?;

        let path = self.file_path.display().to_string();
        let mut new_path = format!("{}.old", path);

        let mut counter = 1;
        while Path::new(&new_path).exists() {
            new_path = format!("{}.old{}", path, counter);
            counter += 1;
        }

        std::fs::rename(&self.file_path, &new_path)
            .with_context(|| format!("Failed rotating log file to {}", new_path))?;

        *file = LineWriter::new(open_append(&self.file_path)?);
        Ok(())
    }
}

impl LogSink for FileSink {
    fn write_bytes(&self, bytes: &[u8]) -> eyre::Result<()> {
        let mut file = lock(&self.file)?;

        self.rotate_if_exceeds_max_file_size(&mut file)?;

        file.write_all(bytes)?;
        file.flush().context("Can't flush file")
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

pub struct StderrSink {
    handle: std::io::Stderr,
}

impl StderrSink {
    pub fn new() -> Self {
        Self {
            handle: std::io::stderr(),
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StderrSink {
    fn write_bytes(&self, bytes: &[u8]) -> eyre::Result<()> {
        let mut writer = self.handle.lock();

        writer.write_all(bytes)?;
        writer.flush().context("Can't flush stderr")
    }

    fn flush(&self) {
        let _ = self.handle.lock().flush();
    }
}

pub struct StdoutSink {
    handle: std::io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            handle: std::io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for StdoutSink {
    fn write_bytes(&self, bytes: &[u8]) -> eyre::Result<()> {
        let mut writer = self.handle.lock();

        writer.write_all(bytes)?;
        writer.flush().context("Can't flush stdout")
    }

    fn flush(&self) {
        let _ = self.handle.lock().flush();
    }
}

/// Any `Write` implementation, serialized behind a mutex.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> eyre::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| eyre::eyre!(e.to_string()))
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_bytes(&self, bytes: &[u8]) -> eyre::Result<()> {
        let mut writer = lock(&self.writer)?;
        writer.write_all(bytes).context("Failed writing to log writer")
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

/// Collects everything written to it. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn clear(&self) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.clear();
        }
    }
}

impl LogSink for MemorySink {
    fn write_bytes(&self, bytes: &[u8]) -> eyre::Result<()> {
        lock(&self.buffer)?.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&self) {}
}

#[derive(Default)]
pub struct NullSink {}

impl NullSink {
    pub fn new() -> Self {
        Self {}
    }
}

impl LogSink for NullSink {
    fn write_bytes(&self, _bytes: &[u8]) -> eyre::Result<()> {
        Ok(())
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let sink = FileSink::new(&path).unwrap();
        sink.write_bytes(b"first\n").unwrap();
        sink.write_bytes(b"second\n").unwrap();
        drop(sink);

        let sink = FileSink::new(&path).unwrap();
        sink.write_bytes(b"third\n").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\nthird\n");
    }

    #[test]
    fn test_file_sink_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let sink = FileSink::new(&path).unwrap().with_max_file_size(8);
        sink.write_bytes(b"0123456789\n").unwrap();
        sink.write_bytes(b"after\n").unwrap();

        let rotated = std::fs::read_to_string(dir.path().join("app.log.old")).unwrap();
        assert_eq!(rotated, "0123456789\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "after\n");
    }

    #[test]
    fn test_file_sink_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileSink::new(dir.path().join("missing").join("app.log")).is_err());
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let handle = sink.clone();

        sink.write_bytes(b"hello").unwrap();
        assert_eq!(handle.contents_string(), "hello");

        handle.clear();
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_writer_sink() {
        let sink = WriterSink::new(Vec::new());
        sink.write_bytes(b"abc").unwrap();
        sink.write_bytes(b"def").unwrap();

        assert_eq!(sink.into_inner().unwrap(), b"abcdef");
    }
}
