//! Single-file NIfTI-1 volumes.

use crate::codec::{
    Attempt, DEFAULT_LEVEL, Format, GZIP_MAGIC, LoadRequest, SaveRequest, Targets, decode_failure,
    ends_with_suffix, matched_suffix,
};
use crate::io::PathAdapter;
use crate::value::{Value, Volume, is_nifti1};
use crate::{Error, Result};
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use std::io::{Read, Write};
use std::path::Path;

/// NIfTI-1 format.
///
/// Works on paths only. Compressed `.nii.gz` files are recognised by their
/// gzip magic on load and written compressed whenever the name ends in
/// `.gz`. Header, extension and voxel bytes are kept verbatim.
#[derive(Debug, Clone, Copy)]
pub struct Nifti {
    level: u32,
}

impl Default for Nifti {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }
}

impl Nifti {
    /// Sets the level `.nii.gz` files are compressed with, capped at 9.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    fn decompress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out)?;
        Ok(out)
    }
}

impl Format for Nifti {
    fn name(&self) -> &'static str {
        "nifti"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".nii", ".nii.gz"]
    }

    fn targets(&self) -> Targets {
        Targets::PathOnly
    }

    fn sniffable(&self) -> bool {
        true
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Volume(_))
    }

    fn load_path(&self, path: &Path, request: &LoadRequest<'_>) -> Result<Attempt<Value>> {
        let raw = PathAdapter::read(path)?;
        let bytes = if raw.starts_with(&GZIP_MAGIC) {
            match Self::decompress(&raw) {
                Ok(bytes) => bytes,
                Err(e) => return decode_failure(self.name(), request.hint, e),
            }
        } else {
            raw
        };
        if !is_nifti1(&bytes) {
            return decode_failure(self.name(), request.hint, "missing NIfTI-1 magic");
        }
        match Volume::from_bytes(&bytes) {
            Ok(volume) => Ok(Attempt::Done(Value::Volume(volume))),
            Err(e) => decode_failure(self.name(), request.hint, e),
        }
    }

    fn save_path(
        &self,
        value: &Value,
        path: &Path,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let Value::Volume(volume) = value else {
            return Ok(Attempt::wrong_format("nifti stores volumes only"));
        };
        let name = request
            .hint
            .or_else(|| path.file_name().and_then(|name| name.to_str()));
        let compress = name.is_some_and(|name| ends_with_suffix(name, ".gz"));

        let mut pending = PathAdapter::create(path)?;
        let bytes = volume.to_bytes();
        let written = if compress {
            let mut encoder = GzBuilder::new()
                .mtime(0)
                .write(pending.file_mut(), Compression::new(self.level));
            encoder
                .write_all(&bytes)
                .and_then(|()| encoder.try_finish())
        } else {
            pending.file_mut().write_all(&bytes)
        };
        written.map_err(|e| Error::io(format!("write {}", path.display()), e))?;
        pending.commit()?;

        let suffix = if compress {
            ".nii.gz".to_string()
        } else {
            matched_suffix(self.extensions(), name)
        };
        Ok(Attempt::Done(suffix))
    }
}
