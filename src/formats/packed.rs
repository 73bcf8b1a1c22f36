//! Self-describing CBOR catch-all.

use super::encode_error;
use crate::codec::{Attempt, Format, LoadRequest, SaveRequest, decode_failure, matched_suffix};
use crate::io::{ReadStream, WriteStream, read_magic};
use crate::value::Value;
use crate::{Error, Result};
use std::io::Write;

/// CBOR self-describe tag (55799), written before every packed value.
pub const PACKED_MAGIC: [u8; 3] = [0xd9, 0xd9, 0xf7];

/// Packed format: any in-memory [`Value`] as tagged CBOR.
///
/// Registered last so that it only catches values no specific format
/// claimed. Lazy arrays are refused since they only describe a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Packed;

impl Format for Packed {
    fn name(&self) -> &'static str {
        "packed"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".pkl", ".cbor"]
    }

    fn sniffable(&self) -> bool {
        true
    }

    fn accepts(&self, value: &Value) -> bool {
        !matches!(value, Value::LazyArray(_))
    }

    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let magic = read_magic::<3>(source).map_err(|e| Error::io("read packed header", e))?;
        if magic != Some(PACKED_MAGIC) {
            return decode_failure(self.name(), request.hint, "missing CBOR self-describe tag");
        }
        match ciborium::from_reader::<Value, _>(source) {
            Ok(value) => Ok(Attempt::Done(value)),
            Err(ciborium::de::Error::Io(e)) => Err(Error::io("read packed value", e)),
            Err(e) => decode_failure(self.name(), request.hint, format!("{e:?}")),
        }
    }

    fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        if matches!(value, Value::LazyArray(_)) {
            return Ok(Attempt::wrong_format("lazy arrays cannot be packed"));
        }
        sink.write_all(&PACKED_MAGIC)
            .map_err(|e| Error::io("write packed header", e))?;
        match ciborium::into_writer(value, &mut *sink) {
            Ok(()) => {}
            Err(ciborium::ser::Error::Io(e)) => return Err(Error::io("write packed value", e)),
            Err(ciborium::ser::Error::Value(message)) => {
                return Err(encode_error(self.name(), message));
            }
        }
        sink.flush().map_err(|e| Error::io("write packed value", e))?;
        Ok(Attempt::Done(matched_suffix(self.extensions(), request.hint)))
    }
}
