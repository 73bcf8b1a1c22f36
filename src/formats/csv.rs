//! Comma-separated tables.

use super::encode_error;
use crate::codec::{Attempt, Format, LoadRequest, Params, SaveRequest, decode_failure};
use crate::io::{ReadStream, WriteStream};
use crate::value::{Table, Value};
use crate::{Error, Result};
use std::borrow::Cow;

/// CSV format.
///
/// The first record is the header row. Parameters:
/// - `delimiter` (load and save): a single ASCII character, default `,`
/// - `index` (save): prepend a 0-based row-number column with an empty header
#[derive(Debug, Clone, Copy, Default)]
pub struct Csv;

fn delimiter(params: &Params) -> Result<u8> {
    match params.get_str("delimiter")? {
        None => Ok(b','),
        Some(s) => match s.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(Error::InvalidInput(format!(
                "csv delimiter must be a single ASCII character, got {s:?}"
            ))),
        },
    }
}

impl Format for Csv {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".csv"]
    }

    fn load_params(&self) -> &'static [&'static str] {
        &["delimiter"]
    }

    fn save_params(&self) -> &'static [&'static str] {
        &["index", "delimiter"]
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Table(_))
    }

    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter(request.params)?)
            .from_reader(source);

        let headers = match reader.headers() {
            Ok(headers) => headers.iter().map(String::from).collect(),
            Err(e) if e.is_io_error() => return Err(io_error("read csv headers", e)),
            Err(e) => return decode_failure(self.name(), request.hint, e),
        };
        let mut rows = Vec::new();
        for record in reader.records() {
            match record {
                Ok(record) => rows.push(record.iter().map(String::from).collect()),
                Err(e) if e.is_io_error() => return Err(io_error("read csv", e)),
                Err(e) => return decode_failure(self.name(), request.hint, e),
            }
        }

        match Table::new(headers, rows) {
            Ok(table) => Ok(Attempt::Done(Value::Table(table))),
            Err(e) => decode_failure(self.name(), request.hint, e),
        }
    }

    fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let Value::Table(table) = value else {
            return Ok(Attempt::wrong_format("csv stores tables only"));
        };
        let table = if request.params.get_bool("index")?.unwrap_or(false) {
            Cow::Owned(table.with_index())
        } else {
            Cow::Borrowed(table)
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter(request.params)?)
            .from_writer(sink);
        let write_err = |e: csv::Error| {
            if e.is_io_error() {
                io_error("write csv", e)
            } else {
                encode_error("csv", e)
            }
        };
        if !table.headers().is_empty() {
            writer.write_record(table.headers()).map_err(write_err)?;
        }
        for row in table.rows() {
            writer.write_record(row).map_err(write_err)?;
        }
        writer.flush().map_err(|e| Error::io("write csv", e))?;
        Ok(Attempt::Done(".csv".to_string()))
    }
}

fn io_error(operation: &str, e: csv::Error) -> Error {
    match e.into_kind() {
        csv::ErrorKind::Io(e) => Error::io(operation, e),
        other => Error::OperationFailed {
            operation: operation.to_string(),
            cause: format!("{other:?}"),
        },
    }
}
