//! NIfTI-1 volumes.
//!
//! A volume keeps its 348-byte header, any extension bytes and the voxel
//! payload exactly as read, so a load/save round trip reproduces the file.

use super::array::{DType, element_count};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Size of a NIfTI-1 header.
pub const NIFTI1_HEADER_SIZE: usize = 348;

const DIM_OFFSET: usize = 40;
const DATATYPE_OFFSET: usize = 70;
const BITPIX_OFFSET: usize = 72;
const PIXDIM_OFFSET: usize = 76;
const VOX_OFFSET_OFFSET: usize = 108;
const MAGIC_OFFSET: usize = 344;
const SINGLE_FILE_MAGIC: &[u8; 4] = b"n+1\0";

/// A single-file NIfTI-1 image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(with = "super::bytes")]
    header: Vec<u8>,
    #[serde(with = "super::bytes")]
    extension: Vec<u8>,
    #[serde(with = "super::bytes")]
    data: Vec<u8>,
}

/// Returns `true` if `bytes` starts with a single-file NIfTI-1 header.
#[must_use]
pub fn is_nifti1(bytes: &[u8]) -> bool {
    bytes.get(MAGIC_OFFSET..NIFTI1_HEADER_SIZE) == Some(&SINGLE_FILE_MAGIC[..])
}

const fn nifti_datatype(dtype: DType) -> i16 {
    match dtype {
        DType::Bool | DType::U8 => 2,
        DType::I16 => 4,
        DType::I32 => 8,
        DType::F32 => 16,
        DType::F64 => 64,
        DType::I8 => 256,
        DType::U16 => 512,
        DType::U32 => 768,
        DType::I64 => 1024,
        DType::U64 => 1280,
    }
}

impl Volume {
    /// Parses a complete single-file NIfTI-1 image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the magic is missing or the voxel
    /// offset points outside the data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if !is_nifti1(bytes) {
            return Err(Error::InvalidInput(
                "missing NIfTI-1 single-file magic".to_string(),
            ));
        }
        let header = bytes[..NIFTI1_HEADER_SIZE].to_vec();
        let big_endian = read_i32(&header, 0, false) != 348;
        let vox_offset = read_f32(&header, VOX_OFFSET_OFFSET, big_endian);
        if !vox_offset.is_finite() || vox_offset < 0.0 {
            return Err(Error::InvalidInput(format!(
                "invalid voxel offset {vox_offset}"
            )));
        }
        // Offsets below the header size are legacy files with the payload
        // right after the header.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let start = (vox_offset as usize).max(NIFTI1_HEADER_SIZE);
        let Some(extension) = bytes.get(NIFTI1_HEADER_SIZE..start) else {
            return Err(Error::InvalidInput(format!(
                "voxel offset {start} is beyond the end of the file ({} bytes)",
                bytes.len()
            )));
        };
        Ok(Self {
            header,
            extension: extension.to_vec(),
            data: bytes[start..].to_vec(),
        })
    }

    /// Builds a little-endian volume around a voxel payload, with unit voxel
    /// sizes and no spatial transform.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the shape has more than seven
    /// dimensions or does not match the payload length.
    pub fn from_voxels(dtype: DType, shape: &[usize], data: Vec<u8>) -> Result<Self> {
        if shape.is_empty() || shape.len() > 7 {
            return Err(Error::InvalidInput(format!(
                "NIfTI-1 supports 1 to 7 dimensions, got {}",
                shape.len()
            )));
        }
        let expected = element_count(shape).and_then(|n| n.checked_mul(dtype.item_size()));
        if expected != Some(data.len()) {
            return Err(Error::InvalidInput(format!(
                "volume of {dtype} {shape:?} does not match a {} byte payload",
                data.len()
            )));
        }

        let mut header = vec![0u8; NIFTI1_HEADER_SIZE];
        header[0..4].copy_from_slice(&348i32.to_le_bytes());
        let mut dims = [1i16; 8];
        dims[0] = i16::try_from(shape.len()).unwrap_or(7);
        for (slot, &dim) in dims[1..].iter_mut().zip(shape) {
            *slot = i16::try_from(dim).map_err(|_| {
                Error::InvalidInput(format!("dimension {dim} exceeds the NIfTI-1 limit"))
            })?;
        }
        for (i, dim) in dims.iter().enumerate() {
            let at = DIM_OFFSET + i * 2;
            header[at..at + 2].copy_from_slice(&dim.to_le_bytes());
        }
        header[DATATYPE_OFFSET..DATATYPE_OFFSET + 2]
            .copy_from_slice(&nifti_datatype(dtype).to_le_bytes());
        let bitpix = i16::try_from(dtype.item_size() * 8).unwrap_or(64);
        header[BITPIX_OFFSET..BITPIX_OFFSET + 2].copy_from_slice(&bitpix.to_le_bytes());
        for i in 0..8 {
            let at = PIXDIM_OFFSET + i * 4;
            header[at..at + 4].copy_from_slice(&1.0f32.to_le_bytes());
        }
        // Payload follows the header plus the 4-byte extension flag.
        header[VOX_OFFSET_OFFSET..VOX_OFFSET_OFFSET + 4].copy_from_slice(&352.0f32.to_le_bytes());
        header[MAGIC_OFFSET..].copy_from_slice(SINGLE_FILE_MAGIC);

        Ok(Self {
            header,
            extension: vec![0; 4],
            data,
        })
    }

    /// The raw header.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Bytes between the header and the voxel payload.
    #[must_use]
    pub fn extension(&self) -> &[u8] {
        &self.extension
    }

    /// The voxel payload.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn big_endian(&self) -> bool {
        read_i32(&self.header, 0, false) != 348
    }

    /// Image dimensions, `dim[1..=dim[0]]`.
    #[must_use]
    pub fn dims(&self) -> Vec<usize> {
        let big_endian = self.big_endian();
        let ndim = usize::try_from(read_i16(&self.header, DIM_OFFSET, big_endian))
            .unwrap_or(0)
            .min(7);
        (1..=ndim)
            .map(|i| usize::try_from(read_i16(&self.header, DIM_OFFSET + i * 2, big_endian)).unwrap_or(0))
            .collect()
    }

    /// NIfTI datatype code.
    #[must_use]
    pub fn datatype(&self) -> i16 {
        read_i16(&self.header, DATATYPE_OFFSET, self.big_endian())
    }

    /// Serialises the image back into a single file.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.header.len() + self.extension.len() + self.data.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.extension);
        out.extend_from_slice(&self.data);
        out
    }
}

fn field<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    bytes
        .get(at..at + N)
        .and_then(|slice| slice.try_into().ok())
        .unwrap_or([0; N])
}

fn read_i16(bytes: &[u8], at: usize, big_endian: bool) -> i16 {
    let raw = field::<2>(bytes, at);
    if big_endian { i16::from_be_bytes(raw) } else { i16::from_le_bytes(raw) }
}

fn read_i32(bytes: &[u8], at: usize, big_endian: bool) -> i32 {
    let raw = field::<4>(bytes, at);
    if big_endian { i32::from_be_bytes(raw) } else { i32::from_le_bytes(raw) }
}

fn read_f32(bytes: &[u8], at: usize, big_endian: bool) -> f32 {
    let raw = field::<4>(bytes, at);
    if big_endian { f32::from_be_bytes(raw) } else { f32::from_le_bytes(raw) }
}
