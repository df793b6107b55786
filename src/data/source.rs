//! File byte-range access, scoped to a single load call.
//!
//! Geometry and variable files are memory-mapped where the host platform
//! permits it; [`FileSource::open`] falls back to a heap read when mmap
//! construction fails (e.g. zero-length files, some network filesystems).
//! Either way the bytes are released when the `FileSource` is dropped,
//! including on every error path, since ownership is a plain `enum` with no
//! background thread or cache to outlive the call.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{EResult, EncasError};

enum Backing {
    Mapped(Mmap),
    Heap(Vec<u8>),
}

/// An immutable view over an entire file's bytes.
pub struct FileSource {
    backing: Backing,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> EResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                rootcause::Report::new(EncasError::NotFound {
                    what: "file",
                    path: path.display().to_string(),
                })
            } else {
                rootcause::Report::new(EncasError::Io(e))
            }
        })?;

        // SAFETY: the file is not concurrently truncated by this process;
        // the mapping is dropped with this FileSource before the next call
        // that might invalidate it.
        match unsafe { Mmap::map(&file) } {
            Ok(mmap) => Ok(Self {
                backing: Backing::Mapped(mmap),
            }),
            Err(_) => {
                use std::io::Read;
                let mut file = file;
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)
                    .map_err(|e| rootcause::Report::new(EncasError::Io(e)))?;
                Ok(Self {
                    backing: Backing::Heap(buf),
                })
            }
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(mmap) => mmap.as_ref(),
            Backing::Heap(buf) => buf.as_slice(),
        }
    }
}
