//! Leaf formats.
//!
//! Each format implements [`Format`](crate::codec::Format) and is installed
//! in a [`Registry`](crate::codec::Registry) through
//! [`ExtensionMatch`](crate::codec::ExtensionMatch). JSON and text are
//! always available; the rest sit behind cargo features named after them.
//!
//! | Format | Suffixes | Value | Sniffable |
//! |--------|----------|-------|-----------|
//! | [`Json`] | `.json` | `Json` | yes |
//! | [`Text`] | `.txt` | `Text` | no |
//! | `Npy` | `.npy` | `Array` | yes |
//! | `Csv` | `.csv` | `Table` | no |
//! | `Yaml` | `.yaml`, `.yml` | `Json` | no |
//! | `Image` | `.png`, `.jpg`, `.jpeg`, `.tif`, `.tiff`, `.bmp` | `Array` of `u8` | yes |
//! | `Nifti` | `.nii`, `.nii.gz` | `Volume` | yes |
//! | `Dicom` | `.dcm` | `Dicom` | yes |
//! | `Packed` | `.pkl`, `.cbor` | anything in memory | yes |

#[cfg(feature = "csv")]
mod csv;
#[cfg(feature = "dicom")]
mod dicom;
#[cfg(feature = "image")]
mod image;
mod json;
#[cfg(feature = "nifti")]
mod nifti;
#[cfg(feature = "npy")]
mod npy;
#[cfg(feature = "packed")]
mod packed;
mod text;
#[cfg(feature = "yaml")]
mod yaml;

#[cfg(feature = "csv")]
pub use self::csv::Csv;
#[cfg(feature = "dicom")]
pub use dicom::Dicom;
#[cfg(feature = "image")]
pub use self::image::Image;
pub use json::Json;
#[cfg(feature = "nifti")]
pub use nifti::Nifti;
#[cfg(feature = "npy")]
pub use npy::{NPY_MAGIC, Npy};
#[cfg(feature = "packed")]
pub use packed::{PACKED_MAGIC, Packed};
pub use text::Text;
#[cfg(feature = "yaml")]
pub use yaml::Yaml;

use crate::Error;
use crate::codec::Direction;

/// Wraps an encoder failure.
pub(crate) fn encode_error(
    codec: &str,
    cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> Error {
    Error::format(codec, Direction::Save, cause)
}
