//! DICOM Part 10 files.

use crate::codec::{Attempt, Format, LoadRequest, SaveRequest, decode_failure};
use crate::io::{ReadStream, WriteStream, read_magic};
use crate::value::{DICOM_PREAMBLE_SIZE, DicomFile, Value, is_dicom};
use crate::{Error, Result};
use std::io::{Read, Write};

/// DICOM format.
///
/// Recognised by the `DICM` prefix after the 128-byte preamble. The file
/// is stored verbatim, so a load/save round trip reproduces it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dicom;

impl Format for Dicom {
    fn name(&self) -> &'static str {
        "dicom"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".dcm"]
    }

    fn sniffable(&self) -> bool {
        true
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Dicom(_))
    }

    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let head = read_magic::<{ DICOM_PREAMBLE_SIZE + 4 }>(source)
            .map_err(|e| Error::io("read dicom preamble", e))?;
        let Some(head) = head.filter(|head| is_dicom(head)) else {
            return decode_failure(self.name(), request.hint, "missing DICM prefix");
        };

        let mut bytes = head.to_vec();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| Error::io("read dicom file", e))?;
        match DicomFile::from_bytes(bytes) {
            Ok(file) => Ok(Attempt::Done(Value::Dicom(file))),
            Err(e) => decode_failure(self.name(), request.hint, e),
        }
    }

    fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        _request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let Value::Dicom(file) = value else {
            return Ok(Attempt::wrong_format("dicom stores dicom files only"));
        };
        sink.write_all(file.as_bytes())
            .and_then(|()| sink.flush())
            .map_err(|e| Error::io("write dicom file", e))?;
        Ok(Attempt::Done(".dcm".to_string()))
    }
}
