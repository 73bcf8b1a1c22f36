//! NumPy `.npy` arrays.
//!
//! Files are written in format version 1.0 (2.0 when the header would not
//! fit), byte-for-byte the way `numpy.save` lays them out, including the
//! header padding that leaves room to grow the leading dimension in place.
//! Versions 1.0, 2.0 and 3.0 are read.

use crate::codec::{Attempt, Capability, Format, LoadRequest, SaveRequest, decode_failure};
use crate::io::{PathAdapter, ReadStream, WriteStream, read_magic};
use crate::value::{DType, LazyArray, NdArray, Value};
use crate::{Error, Result};
use std::io::{self, Read, Write};
use std::path::Path;

/// Leading bytes of every `.npy` file.
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

const ARRAY_ALIGN: usize = 64;
const GROWTH_AXIS_MAX_DIGITS: usize = 21;

/// NumPy array format.
///
/// With the load parameter `lazy: true`, loading a path returns a
/// [`LazyArray`] that reads the payload on demand. Streams cannot be loaded
/// lazily, and neither can paths when the caller disallows it; both cases
/// report [`Capability::LazyLoading`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Npy;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    dtype: DType,
    fortran_order: bool,
    shape: Vec<usize>,
    /// Byte offset of the payload from the start of the file.
    data_offset: u64,
}

impl Header {
    fn payload_len(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(self.dtype.item_size(), |acc, &dim| acc.checked_mul(dim))
    }
}

/// Reads the preamble. The outer error is I/O; the inner one means the
/// bytes are not a valid `.npy` header.
fn read_header(source: &mut dyn ReadStream) -> io::Result<std::result::Result<Header, String>> {
    match read_magic::<6>(source)? {
        Some(magic) if &magic == NPY_MAGIC => {}
        _ => return Ok(Err("missing .npy magic".to_string())),
    }
    let Some([major, minor]) = read_magic::<2>(source)? else {
        return Ok(Err("truncated .npy version".to_string()));
    };
    let (len_size, utf8) = match (major, minor) {
        (1, 0) => (2, false),
        (2, 0) => (4, false),
        (3, 0) => (4, true),
        _ => return Ok(Err(format!("unsupported .npy version {major}.{minor}"))),
    };
    let header_len = if len_size == 2 {
        let Some(raw) = read_magic::<2>(source)? else {
            return Ok(Err("truncated .npy header length".to_string()));
        };
        usize::from(u16::from_le_bytes(raw))
    } else {
        let Some(raw) = read_magic::<4>(source)? else {
            return Ok(Err("truncated .npy header length".to_string()));
        };
        usize::try_from(u32::from_le_bytes(raw)).unwrap_or(usize::MAX)
    };

    let mut raw = Vec::new();
    Read::take(&mut *source, u64::try_from(header_len).unwrap_or(u64::MAX))
        .read_to_end(&mut raw)?;
    if raw.len() != header_len {
        return Ok(Err("truncated .npy header".to_string()));
    }
    let text = if utf8 {
        match String::from_utf8(raw) {
            Ok(text) => text,
            Err(_) => return Ok(Err(".npy header is not valid UTF-8".to_string())),
        }
    } else {
        raw.iter().map(|&b| char::from(b)).collect()
    };

    let data_offset = 6 + 2 + len_size + header_len;
    Ok(parse_header_dict(&text).map(|(dtype, fortran_order, shape)| Header {
        dtype,
        fortran_order,
        shape,
        data_offset: u64::try_from(data_offset).unwrap_or(u64::MAX),
    }))
}

/// Parses `{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }`.
fn parse_header_dict(text: &str) -> std::result::Result<(DType, bool, Vec<usize>), String> {
    let mut cursor = DictCursor::new(text.trim_end());
    let mut descr = None;
    let mut fortran_order = None;
    let mut shape = None;

    cursor.expect('{')?;
    loop {
        cursor.skip_ws();
        if cursor.eat('}') {
            break;
        }
        let key = cursor.string()?;
        cursor.skip_ws();
        cursor.expect(':')?;
        cursor.skip_ws();
        match key.as_str() {
            "descr" => descr = Some(cursor.string()?),
            "fortran_order" => fortran_order = Some(cursor.boolean()?),
            "shape" => shape = Some(cursor.tuple()?),
            other => return Err(format!("unexpected .npy header key {other:?}")),
        }
        cursor.skip_ws();
        if !cursor.eat(',') {
            cursor.skip_ws();
            cursor.expect('}')?;
            break;
        }
    }

    let descr = descr.ok_or("missing 'descr' in .npy header")?;
    let dtype = DType::from_descr(&descr).ok_or_else(|| format!("unsupported dtype {descr:?}"))?;
    Ok((
        dtype,
        fortran_order.ok_or("missing 'fortran_order' in .npy header")?,
        shape.ok_or("missing 'shape' in .npy header")?,
    ))
}

struct DictCursor<'a> {
    rest: &'a str,
}

impl<'a> DictCursor<'a> {
    const fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, c: char) -> std::result::Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(format!("expected {c:?} in .npy header"))
        }
    }

    fn string(&mut self) -> std::result::Result<String, String> {
        let quote = self
            .rest
            .chars()
            .next()
            .filter(|c| *c == '\'' || *c == '"')
            .ok_or("expected a quoted string in .npy header")?;
        let body = &self.rest[1..];
        let end = body
            .find(quote)
            .ok_or("unterminated string in .npy header")?;
        let value = body[..end].to_string();
        self.rest = &body[end + 1..];
        Ok(value)
    }

    fn boolean(&mut self) -> std::result::Result<bool, String> {
        if let Some(rest) = self.rest.strip_prefix("True") {
            self.rest = rest;
            Ok(true)
        } else if let Some(rest) = self.rest.strip_prefix("False") {
            self.rest = rest;
            Ok(false)
        } else {
            Err("expected True or False in .npy header".to_string())
        }
    }

    fn tuple(&mut self) -> std::result::Result<Vec<usize>, String> {
        self.expect('(')?;
        let mut dims = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(')') {
                return Ok(dims);
            }
            let digits = self
                .rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(self.rest.len());
            let dim = self.rest[..digits]
                .parse::<usize>()
                .map_err(|_| "expected a dimension in .npy shape".to_string())?;
            dims.push(dim);
            self.rest = &self.rest[digits..];
            self.skip_ws();
            if !self.eat(',') {
                self.skip_ws();
                self.expect(')')?;
                return Ok(dims);
            }
        }
    }
}

fn shape_repr(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [only] => format!("({only},)"),
        _ => {
            let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
            format!("({})", dims.join(", "))
        }
    }
}

/// Builds the complete preamble for `array`.
fn encode_header(dtype: DType, shape: &[usize], fortran_order: bool) -> Vec<u8> {
    let mut dict = format!(
        "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
        dtype.descr(),
        if fortran_order { "True" } else { "False" },
        shape_repr(shape)
    );
    let growth_axis = if fortran_order { shape.last() } else { shape.first() };
    if let Some(dim) = growth_axis {
        let digits = dim.to_string().len();
        dict.push_str(&" ".repeat(GROWTH_AXIS_MAX_DIGITS.saturating_sub(digits)));
    }

    // The dict plus its terminating newline, padded so the payload starts
    // on an ARRAY_ALIGN boundary.
    let hlen = dict.len() + 1;
    let pad_for = |len_size: usize| ARRAY_ALIGN - (6 + 2 + len_size + hlen) % ARRAY_ALIGN;

    let mut out = Vec::with_capacity(hlen + ARRAY_ALIGN + 12);
    out.extend_from_slice(NPY_MAGIC);
    let padlen = pad_for(2);
    if let Ok(total) = u16::try_from(hlen + padlen) {
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(dict.as_bytes());
        out.resize(out.len() + padlen, b' ');
    } else {
        let padlen = pad_for(4);
        let total = u32::try_from(hlen + padlen).unwrap_or(u32::MAX);
        out.extend_from_slice(&[2, 0]);
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(dict.as_bytes());
        out.resize(out.len() + padlen, b' ');
    }
    out.push(b'\n');
    out
}

impl Npy {
    fn lazy(request: &LoadRequest<'_>) -> Result<bool> {
        Ok(request.params.get_bool("lazy")?.unwrap_or(false))
    }

    fn header_or_decline<T>(
        &self,
        source: &mut dyn ReadStream,
        hint: Option<&str>,
    ) -> Result<std::result::Result<Header, Attempt<T>>> {
        match read_header(source).map_err(|e| Error::io("read .npy header", e))? {
            Ok(header) => Ok(Ok(header)),
            Err(reason) => decode_failure(self.name(), hint, reason).map(Err),
        }
    }
}

impl Format for Npy {
    fn name(&self) -> &'static str {
        "npy"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".npy"]
    }

    fn sniffable(&self) -> bool {
        true
    }

    fn load_params(&self) -> &'static [&'static str] {
        &["lazy"]
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Array(_) | Value::LazyArray(_))
    }

    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let header = match self.header_or_decline(source, request.hint)? {
            Ok(header) => header,
            Err(declined) => return Ok(declined),
        };
        if Self::lazy(request)? {
            return Ok(Attempt::RequiresCapability(Capability::LazyLoading));
        }

        let Some(len) = header.payload_len() else {
            return decode_failure(
                self.name(),
                request.hint,
                format!("array shape {:?} is too large", header.shape),
            );
        };
        let mut data = Vec::new();
        Read::take(&mut *source, u64::try_from(len).unwrap_or(u64::MAX))
            .read_to_end(&mut data)
            .map_err(|e| Error::io("read .npy payload", e))?;
        if data.len() != len {
            return decode_failure(
                self.name(),
                request.hint,
                format!("payload truncated: expected {len} bytes, got {}", data.len()),
            );
        }
        let array = NdArray::new(header.dtype, header.shape, data)?
            .with_fortran_order(header.fortran_order);
        Ok(Attempt::Done(Value::Array(array)))
    }

    fn load_path(&self, path: &Path, request: &LoadRequest<'_>) -> Result<Attempt<Value>> {
        let mut file = PathAdapter::open(path)?;
        if !(Self::lazy(request)? && request.allow_lazy) {
            return self.load_stream(&mut file, request);
        }

        let header = match self.header_or_decline(&mut file, request.hint)? {
            Ok(header) => header,
            Err(declined) => return Ok(declined),
        };
        let file_len = file
            .metadata()
            .map_err(|e| Error::io(format!("stat {}", path.display()), e))?
            .len();
        let needed = header
            .payload_len()
            .and_then(|len| u64::try_from(len).ok())
            .and_then(|len| len.checked_add(header.data_offset));
        if needed.is_none_or(|needed| needed > file_len) {
            return decode_failure(self.name(), request.hint, "payload truncated");
        }
        Ok(Attempt::Done(Value::LazyArray(LazyArray::new(
            path,
            header.dtype,
            header.shape,
            header.fortran_order,
            header.data_offset,
        ))))
    }

    fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        _request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let loaded;
        let array = match value {
            Value::Array(array) => array,
            Value::LazyArray(lazy) => {
                loaded = lazy.load()?;
                &loaded
            }
            _ => return Ok(Attempt::wrong_format("npy stores arrays only")),
        };
        let header = encode_header(array.dtype(), array.shape(), array.fortran_order());
        sink.write_all(&header)
            .and_then(|()| sink.write_all(array.data()))
            .and_then(|()| sink.flush())
            .map_err(|e| Error::io("write .npy", e))?;
        Ok(Attempt::Done(".npy".to_string()))
    }
}
