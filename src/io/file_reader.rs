use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;

use super::range_reader::{check_range, RangeReader};
use crate::error::IoError;

/// Local-file implementation of RangeReader.
///
/// The file handle is owned by the reader and closed when it is dropped.
/// Each read seeks under a lock, so the handle's cursor never leaks between
/// callers.
pub struct FileRangeReader {
    file: Mutex<File>,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Open a file for positional reads.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let identifier = path.display().to_string();

        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IoError::NotFound(identifier.clone()),
            _ => IoError::Io(format!("{}: {}", identifier, e)),
        })?;
        let size = file.metadata()?.len();

        Ok(Self {
            file: Mutex::new(file),
            size,
            identifier,
        })
    }
}

impl RangeReader for FileRangeReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;

        let mut buf = vec![0u8; len];
        let mut file = self
            .file
            .lock()
            .map_err(|_| IoError::Io(format!("{}: file lock poisoned", self.identifier)))?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
