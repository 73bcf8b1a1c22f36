//! YAML documents, loaded into the JSON data model.

use super::encode_error;
use crate::codec::{Attempt, Format, LoadRequest, SaveRequest, decode_failure, matched_suffix};
use crate::io::{ReadStream, WriteStream};
use crate::value::Value;
use crate::{Error, Result};
use serde_json::Value as JsonValue;
use std::io::{Read, Write};

/// YAML format.
///
/// Only the first document of a stream is read. Mappings with non-string
/// keys do not fit the JSON model and fail to load.
#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

impl Format for Yaml {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".yaml", ".yml"]
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Json(_))
    }

    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let mut content = Vec::new();
        source
            .read_to_end(&mut content)
            .map_err(|e| Error::io("read yaml", e))?;
        match serde_yaml_ng::from_slice::<JsonValue>(&content) {
            Ok(json) => Ok(Attempt::Done(Value::Json(json))),
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
            return Ok(Attempt::wrong_format("yaml stores json values only"));
        };
        let text = serde_yaml_ng::to_string(json).map_err(|e| encode_error(self.name(), e))?;
        sink.write_all(text.as_bytes())
            .and_then(|()| sink.flush())
            .map_err(|e| Error::io("write yaml", e))?;
        Ok(Attempt::Done(matched_suffix(self.extensions(), request.hint)))
    }
}
