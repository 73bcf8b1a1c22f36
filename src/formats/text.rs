//! Plain UTF-8 text.

use crate::codec::{Attempt, Format, LoadRequest, SaveRequest, decode_failure};
use crate::io::{ReadStream, WriteStream};
use crate::value::Value;
use crate::{Error, Result};
use std::io::{ErrorKind, Read, Write};

/// Text format. Not sniffable: any byte sequence that is valid UTF-8 would
/// pass, so it only runs when a hint names it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl Format for Text {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".txt"]
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Text(_))
    }

    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let mut text = String::new();
        match source.read_to_string(&mut text) {
            Ok(_) => Ok(Attempt::Done(Value::Text(text))),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                decode_failure(self.name(), request.hint, "input is not valid UTF-8")
            }
            Err(e) => Err(Error::io("read text", e)),
        }
    }

    fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        _request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let Value::Text(text) = value else {
            return Ok(Attempt::wrong_format("text stores strings only"));
        };
        sink.write_all(text.as_bytes())
            .and_then(|()| sink.flush())
            .map_err(|e| Error::io("write text", e))?;
        Ok(Attempt::Done(".txt".to_string()))
    }
}
