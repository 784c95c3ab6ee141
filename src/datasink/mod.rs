pub mod naming;

#[cfg(test)]
mod sink_test;

use crate::config::{Config, OutputTarget, Rotation};
use crate::error::SinkError;
use crate::time::LocalTime;

use naming::{compute_filename, split_target};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// The OutputSink owns the single destination that log text is appended to: either stdout, which is
// never rotated, or a file whose name carries the current day or hour window.  Nobody else holds a
// reference to the stream.
//
// Rotation is checked by the caller with rotate_if_needed() before every write, and is decided by
// comparing calendar components, not elapsed time, so a sink that was idle across a boundary rotates
// on the next message rather than on a timer.

pub struct OutputSink {
    prefix: String,
    extension: String,
    rotation: Rotation,
    // Start of the window (day or hour) the current file belongs to.
    window: LocalTime,
    stream: Option<Stream>,
    path: Option<PathBuf>,
    files_opened: usize,
}

enum Stream {
    Stdout(io::Stdout),
    File(fs::File),
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Stdout(s) => s.write(buf),
            Stream::File(f) => f.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            // Lock once so a message is not interleaved with anything else on stdout.
            Stream::Stdout(s) => s.lock().write_all(buf),
            Stream::File(f) => f.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Stdout(s) => s.flush(),
            Stream::File(f) => f.flush(),
        }
    }
}

impl OutputSink {
    // Set up the sink for `config` and open the first file, whose window is the one containing
    // `now`.  Failing to open is fatal to the caller.
    pub fn new(config: &Config, now: LocalTime) -> Result<OutputSink, SinkError> {
        match config.output {
            OutputTarget::Stdout => Ok(OutputSink {
                prefix: "".to_string(),
                extension: "".to_string(),
                rotation: Rotation::Never,
                window: now,
                stream: Some(Stream::Stdout(io::stdout())),
                path: None,
                files_opened: 0,
            }),
            OutputTarget::File(ref target) => {
                let (prefix, extension) = split_target(&target.to_string_lossy());
                let mut sink = OutputSink {
                    prefix,
                    extension,
                    rotation: config.rotation,
                    window: now,
                    stream: None,
                    path: None,
                    files_opened: 0,
                };
                sink.open(now)
                    .map_err(|(path, source)| SinkError::Open { path, source })?;
                Ok(sink)
            }
        }
    }

    // Open the file for the window containing `now` and make it the current stream.  The previous
    // stream, if any, must have been closed.  On failure the path that could not be opened is
    // returned with the cause so that the caller can classify the error.
    fn open(&mut self, now: LocalTime) -> Result<(), (PathBuf, io::Error)> {
        debug_assert!(self.stream.is_none());
        let path = PathBuf::from(compute_filename(
            &self.prefix,
            &self.extension,
            self.rotation,
            &now,
        ));
        let file = open_for_append(&path).map_err(|e| (path.clone(), e))?;
        log::info!("Writing to {}", path.display());
        log::debug!("{} output files opened so far", self.files_opened + 1);
        self.window = match self.rotation {
            Rotation::Daily => now.start_of_day(),
            Rotation::Hourly => now.start_of_hour(),
            Rotation::Never => now,
        };
        self.stream = Some(Stream::File(file));
        self.path = Some(path);
        self.files_opened += 1;
        Ok(())
    }

    pub fn needs_rotation(&self, now: &LocalTime) -> bool {
        match self.rotation {
            Rotation::Never => false,
            Rotation::Daily => !self.window.same_day(now),
            Rotation::Hourly => !self.window.same_hour(now),
        }
    }

    // Switch to a new file if `now` is outside the current window.  Returns true if a rotation
    // happened.  A failed rotation leaves the sink without a stream; the caller must treat that as
    // fatal and not write to it again.
    pub fn rotate_if_needed(&mut self, now: LocalTime) -> Result<bool, SinkError> {
        if !self.needs_rotation(&now) {
            return Ok(false);
        }
        log::debug!("Rotating {:?} at {now:?}", self.current_path());
        self.close();
        self.open(now)
            .map_err(|(path, source)| SinkError::Rotate { path, source })?;
        Ok(true)
    }

    // Append `text` exactly as received and flush it.
    pub fn write(&mut self, text: &str) -> Result<(), SinkError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(SinkError::Write {
                source: io::Error::new(io::ErrorKind::NotConnected, "output is closed"),
            });
        };
        stream
            .write_all(text.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|source| SinkError::Write { source })
    }

    // Flush and release the current stream.  Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.flush() {
                log::warn!("Flushing output on close: {e}");
            }
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[cfg(test)]
    pub fn files_opened(&self) -> usize {
        self.files_opened
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        self.close();
    }
}

// Restarting against an existing window file continues it, never truncates it.  Directories are
// not created: a missing directory is an error like any other.
fn open_for_append(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new().append(true).create(true).open(path)
}
