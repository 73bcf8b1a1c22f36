//! JSON documents.

use super::encode_error;
use crate::codec::{Attempt, Format, LoadRequest, SaveRequest, decode_failure};
use crate::io::{ReadStream, WriteStream};
use crate::value::Value;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_json::ser::PrettyFormatter;
use std::io::{BufReader, BufWriter, Write};

/// JSON format.
///
/// Saving accepts an `indent` parameter (number of spaces); without it the
/// output is compact. Output never ends with a newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Format for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".json"]
    }

    fn sniffable(&self) -> bool {
        true
    }

    fn save_params(&self) -> &'static [&'static str] {
        &["indent"]
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Json(_))
    }

    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        match serde_json::from_reader::<_, JsonValue>(BufReader::new(source)) {
            Ok(json) => Ok(Attempt::Done(Value::Json(json))),
            Err(e) if e.is_io() => Err(Error::io("read json", e.into())),
            Err(e) => decode_failure(self.name(), request.hint, e),
        }
    }

    fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let Value::Json(json) = value else {
            return Ok(Attempt::wrong_format("json stores json values only"));
        };
        let indent = request.params.get_u64("indent")?;

        let mut writer = BufWriter::new(sink);
        let written = match indent {
            Some(width) => {
                let width = usize::try_from(width)
                    .map_err(|_| Error::InvalidInput(format!("indent {width} is too large")))?;
                let spaces = vec![b' '; width];
                let formatter = PrettyFormatter::with_indent(&spaces);
                let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
                json.serialize(&mut serializer)
            }
            None => serde_json::to_writer(&mut writer, json),
        };
        written.map_err(|e| {
            if e.is_io() {
                Error::io("write json", e.into())
            } else {
                encode_error(self.name(), e)
            }
        })?;
        writer.flush().map_err(|e| Error::io("write json", e))?;
        Ok(Attempt::Done(".json".to_string()))
    }
}
