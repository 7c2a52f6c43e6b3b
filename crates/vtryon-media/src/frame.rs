//! Scratch files for live frames.

use std::io::Write;
use std::path::Path;

use image::DynamicImage;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use crate::error::MediaResult;
use crate::image_io::open_image;

const FRAME_PREFIX: &str = "live_frame_";

/// A live frame written to disk for the duration of one request.
///
/// The file is removed exactly once, either by [`TempFrame::close`] or when
/// the guard is dropped on an early return.
#[derive(Debug)]
pub struct TempFrame {
    file: NamedTempFile,
}

impl TempFrame {
    /// Write frame bytes to a new scratch file inside `dir`.
    pub fn create_in(dir: impl AsRef<Path>, bytes: &[u8]) -> MediaResult<Self> {
        let mut file = Builder::new()
            .prefix(FRAME_PREFIX)
            .suffix(".jpg")
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        debug!(path = %file.path().display(), size = bytes.len(), "Wrote temp frame");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Decode the frame from disk.
    pub fn decode(&self) -> MediaResult<DynamicImage> {
        open_image(self.path())
    }

    /// Remove the file now, surfacing any deletion error.
    pub fn close(self) -> MediaResult<()> {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!(path = %path.display(), error = %e, "Failed to delete temp frame");
            return Err(e.into());
        }
        Ok(())
    }
}
