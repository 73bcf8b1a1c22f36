//! DICOM Part 10 files.
//!
//! The file is kept byte for byte. Only the file meta group (always
//! explicit VR little endian) is parsed, to validate the file and to
//! describe it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Length of the preamble that precedes the `DICM` prefix.
pub const DICOM_PREAMBLE_SIZE: usize = 128;

/// Prefix following the preamble.
pub const DICOM_MAGIC: [u8; 4] = *b"DICM";

const META_GROUP: u16 = 0x0002;
const GROUP_LENGTH: u16 = 0x0000;
const MEDIA_STORAGE_SOP_CLASS: u16 = 0x0002;
const TRANSFER_SYNTAX: u16 = 0x0010;

/// Explicit VR little endian, the transfer syntax of the meta group.
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";

/// Returns `true` if `bytes` starts with a preamble and the `DICM` prefix.
#[must_use]
pub fn is_dicom(bytes: &[u8]) -> bool {
    bytes.get(DICOM_PREAMBLE_SIZE..DICOM_PREAMBLE_SIZE + 4) == Some(&DICOM_MAGIC[..])
}

/// A DICOM Part 10 file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicomFile {
    #[serde(with = "super::bytes")]
    bytes: Vec<u8>,
}

/// One element of the file meta group.
#[derive(Debug, Clone, Copy)]
struct MetaElement<'a> {
    element: u16,
    value: &'a [u8],
}

impl DicomFile {
    /// Validates and wraps a complete Part 10 file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the `DICM` prefix is missing or
    /// the file meta group is truncated.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if !is_dicom(&bytes) {
            return Err(Error::InvalidInput(
                "missing DICM prefix after the 128-byte preamble".to_string(),
            ));
        }
        let file = Self { bytes };
        file.meta()?;
        Ok(file)
    }

    /// Builds a file from a zero preamble, a minimal meta group and the
    /// encoded data set that follows it.
    #[must_use]
    pub fn from_parts(sop_class_uid: &str, transfer_syntax_uid: &str, dataset: &[u8]) -> Self {
        let mut meta = Vec::new();
        push_element(&mut meta, MEDIA_STORAGE_SOP_CLASS, *b"UI", &uid_value(sop_class_uid));
        push_element(&mut meta, TRANSFER_SYNTAX, *b"UI", &uid_value(transfer_syntax_uid));

        let mut bytes = vec![0u8; DICOM_PREAMBLE_SIZE];
        bytes.extend_from_slice(&DICOM_MAGIC);
        let group_len = u32::try_from(meta.len()).unwrap_or(u32::MAX);
        push_element(&mut bytes, GROUP_LENGTH, *b"UL", &group_len.to_le_bytes());
        bytes.extend_from_slice(&meta);
        bytes.extend_from_slice(dataset);
        Self { bytes }
    }

    /// The complete file.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the file and returns its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Media Storage SOP Class UID from the meta group.
    #[must_use]
    pub fn sop_class_uid(&self) -> Option<String> {
        self.meta_string(MEDIA_STORAGE_SOP_CLASS)
    }

    /// Transfer Syntax UID from the meta group.
    #[must_use]
    pub fn transfer_syntax_uid(&self) -> Option<String> {
        self.meta_string(TRANSFER_SYNTAX)
    }

    /// Bytes after the file meta group.
    #[must_use]
    pub fn dataset(&self) -> &[u8] {
        let end = self.meta_end().unwrap_or(self.bytes.len());
        &self.bytes[end..]
    }

    fn meta_string(&self, element: u16) -> Option<String> {
        let found = self.meta().ok()?.into_iter().find(|e| e.element == element)?;
        let text = std::str::from_utf8(found.value).ok()?;
        Some(text.trim_end_matches(['\0', ' ']).to_string())
    }

    fn meta_end(&self) -> Option<usize> {
        let mut offset = DICOM_PREAMBLE_SIZE + 4;
        while let Some((_, next)) = read_element(&self.bytes, offset).ok()? {
            offset = next;
        }
        Some(offset)
    }

    fn meta(&self) -> Result<Vec<MetaElement<'_>>> {
        let mut elements = Vec::new();
        let mut offset = DICOM_PREAMBLE_SIZE + 4;
        while let Some((element, next)) = read_element(&self.bytes, offset)? {
            elements.push(element);
            offset = next;
        }
        Ok(elements)
    }
}

/// Reads the meta element at `offset`. `None` once the group ends.
fn read_element(bytes: &[u8], offset: usize) -> Result<Option<(MetaElement<'_>, usize)>> {
    let Some(head) = bytes.get(offset..offset + 8) else {
        return Ok(None);
    };
    let group = u16::from_le_bytes([head[0], head[1]]);
    if group != META_GROUP {
        return Ok(None);
    }
    let element = u16::from_le_bytes([head[2], head[3]]);
    let vr = [head[4], head[5]];
    let (len, start) = if has_long_length(vr) {
        let len = bytes
            .get(offset + 8..offset + 12)
            .map(|raw| u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            .ok_or_else(|| truncated(element))?;
        (len, offset + 12)
    } else {
        (u32::from(u16::from_le_bytes([head[6], head[7]])), offset + 8)
    };
    let end = usize::try_from(len)
        .ok()
        .and_then(|len| start.checked_add(len))
        .ok_or_else(|| truncated(element))?;
    let value = bytes.get(start..end).ok_or_else(|| truncated(element))?;
    Ok(Some((MetaElement { element, value }, end)))
}

fn truncated(element: u16) -> Error {
    Error::InvalidInput(format!(
        "file meta element (0002,{element:04X}) runs past the end of the file"
    ))
}

const fn has_long_length(vr: [u8; 2]) -> bool {
    matches!(
        &vr,
        b"OB" | b"OD" | b"OF" | b"OL" | b"OW" | b"SQ" | b"UC" | b"UN" | b"UR" | b"UT"
    )
}

fn uid_value(uid: &str) -> Vec<u8> {
    let mut value = uid.as_bytes().to_vec();
    if value.len() % 2 == 1 {
        value.push(0);
    }
    value
}

fn push_element(out: &mut Vec<u8>, element: u16, vr: [u8; 2], value: &[u8]) {
    out.extend_from_slice(&META_GROUP.to_le_bytes());
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(&vr);
    let len = u16::try_from(value.len()).unwrap_or(u16::MAX);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    const CT_IMAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

    #[test]
    fn test_parts_layout() {
        let file = DicomFile::from_parts(CT_IMAGE, EXPLICIT_VR_LITTLE_ENDIAN, b"\x08\x00");
        let bytes = file.as_bytes();
        assert!(bytes[..DICOM_PREAMBLE_SIZE].iter().all(|&b| b == 0));
        assert!(is_dicom(bytes));
        // (0002,0000) UL 4
        assert_eq!(&bytes[132..140], b"\x02\x00\x00\x00UL\x04\x00");
        assert_eq!(file.dataset(), b"\x08\x00");
    }

    #[test]
    fn test_meta_strings_are_unpadded() {
        let file = DicomFile::from_parts(CT_IMAGE, EXPLICIT_VR_LITTLE_ENDIAN, &[]);
        assert_eq!(file.sop_class_uid().as_deref(), Some(CT_IMAGE));
        assert_eq!(
            file.transfer_syntax_uid().as_deref(),
            Some(EXPLICIT_VR_LITTLE_ENDIAN)
        );

        let reparsed = DicomFile::from_bytes(file.clone().into_bytes()).unwrap();
        assert_eq!(reparsed, file);
    }

    #[test]
    fn test_rejects_missing_prefix() {
        let err = DicomFile::from_bytes(vec![0u8; 200]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(!is_dicom(b"DICM"));
    }

    #[test]
    fn test_rejects_truncated_meta_element() {
        let mut bytes = DicomFile::from_parts(CT_IMAGE, EXPLICIT_VR_LITTLE_ENDIAN, &[])
            .into_bytes();
        bytes.truncate(bytes.len() - 3);
        let err = DicomFile::from_bytes(bytes).unwrap_err();
        assert!(err.to_string().contains("(0002,0010)"));
    }
}
