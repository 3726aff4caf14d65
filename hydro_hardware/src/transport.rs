//! Telemetry sinks that write one JSON object per line, and the status
//! file that carries the latest record to readers outside the run loop.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hydro_traits::{BoxError, TelemetryTransport};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::HwError;

/// Writes records to any `Write` (stdout in the CLI). Reconnect is a no-op.
#[derive(Debug)]
pub struct JsonLinesTransport<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesTransport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<R: Serialize + ?Sized, W: Write> TelemetryTransport<R> for JsonLinesTransport<W> {
    fn publish(&mut self, record: &R) -> Result<(), BoxError> {
        serde_json::to_writer(&mut self.out, record).map_err(HwError::from)?;
        self.out.write_all(b"\n").map_err(HwError::from)?;
        self.out.flush().map_err(HwError::from)?;
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Appends records to a JSON-lines file.
///
/// A failed write closes the file; publishing then fails with
/// `HwError::NotConnected` until `reconnect` reopens it.
#[derive(Debug)]
pub struct JsonlFileTransport {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl JsonlFileTransport {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HwError> {
        let path = path.as_ref().to_path_buf();
        let file = Some(open_append(&path)?);
        tracing::info!(path = %path.display(), "telemetry file opened");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    fn write_line<R: Serialize + ?Sized>(&mut self, record: &R) -> Result<(), HwError> {
        let file = self.file.as_mut().ok_or(HwError::NotConnected)?;
        serde_json::to_writer(&mut *file, record)?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<BufWriter<File>, HwError> {
    let f = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(f))
}

impl<R: Serialize + ?Sized> TelemetryTransport<R> for JsonlFileTransport {
    fn publish(&mut self, record: &R) -> Result<(), BoxError> {
        match self.write_line(record) {
            Ok(()) => Ok(()),
            Err(e) => {
                if !matches!(e, HwError::NotConnected) {
                    // drop the handle so the next reconnect starts clean
                    self.file = None;
                }
                Err(Box::new(e))
            }
        }
    }

    fn reconnect(&mut self) -> Result<(), BoxError> {
        self.file = Some(open_append(&self.path)?);
        tracing::info!(path = %self.path.display(), "telemetry file reopened");
        Ok(())
    }
}

/// Single JSON document holding the latest controller state.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader polling the path sees either the previous or the new document.
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write<T: Serialize + ?Sized>(&self, doc: &T) -> Result<(), HwError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut f = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut f, doc)?;
            f.write_all(b"\n")?;
            f.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn read<T: DeserializeOwned>(&self) -> Result<T, HwError> {
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
