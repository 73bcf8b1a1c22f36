//! Raster images as `u8` arrays.

use super::encode_error;
use crate::codec::{Attempt, Format, LoadRequest, SaveRequest, decode_failure};
use crate::io::{ReadStream, WriteStream};
use crate::value::{DType, NdArray, Value};
use crate::{Error, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use std::io::{Cursor, Read, Write};

/// Image format.
///
/// Decodes PNG, JPEG, TIFF and BMP into `u8` arrays shaped `[h, w]`
/// (grayscale), `[h, w, 3]` (RGB) or `[h, w, 4]` (RGBA); other pixel types
/// are converted to RGBA. Saving needs a hint, since the last suffix picks
/// the encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Image;

/// The last `.ext` of a hint.
fn last_extension(hint: &str) -> Option<&str> {
    let (_, ext) = hint.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

fn to_array(image: DynamicImage) -> Result<NdArray> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    match image {
        DynamicImage::ImageLuma8(buffer) => {
            NdArray::new(DType::U8, vec![height, width], buffer.into_raw())
        }
        DynamicImage::ImageRgb8(buffer) => {
            NdArray::new(DType::U8, vec![height, width, 3], buffer.into_raw())
        }
        other => NdArray::new(DType::U8, vec![height, width, 4], other.to_rgba8().into_raw()),
    }
}

fn from_array(array: &NdArray) -> Result<DynamicImage> {
    let dimension = |d: usize| {
        u32::try_from(d).map_err(|_| Error::InvalidInput(format!("image dimension {d} is too large")))
    };
    let buffer_error = || Error::InvalidInput("array does not match its image shape".to_string());
    let data = array.data().to_vec();
    match *array.shape() {
        [h, w] => GrayImage::from_raw(dimension(w)?, dimension(h)?, data)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(buffer_error),
        [h, w, 3] => RgbImage::from_raw(dimension(w)?, dimension(h)?, data)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(buffer_error),
        [h, w, 4] => RgbaImage::from_raw(dimension(w)?, dimension(h)?, data)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(buffer_error),
        _ => Err(Error::InvalidInput(format!(
            "cannot store an array of shape {:?} as an image",
            array.shape()
        ))),
    }
}

fn is_image_shaped(array: &NdArray) -> bool {
    array.dtype() == DType::U8
        && !array.fortran_order()
        && matches!(array.shape(), [_, _] | [_, _, 3 | 4])
}

impl Format for Image {
    fn name(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".png", ".jpg", ".jpeg", ".tif", ".tiff", ".bmp"]
    }

    fn sniffable(&self) -> bool {
        true
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Array(array) if is_image_shaped(array))
    }

    fn save_needs_hint(&self) -> bool {
        true
    }

    fn load_stream(
        &self,
        source: &mut dyn ReadStream,
        request: &LoadRequest<'_>,
    ) -> Result<Attempt<Value>> {
        let mut bytes = Vec::new();
        source
            .read_to_end(&mut bytes)
            .map_err(|e| Error::io("read image", e))?;

        let format = match request.hint.and_then(last_extension) {
            Some(ext) => ImageFormat::from_extension(ext),
            None => image::guess_format(&bytes).ok(),
        };
        let Some(format) = format else {
            return decode_failure(self.name(), request.hint, "unrecognised image format");
        };
        match image::load_from_memory_with_format(&bytes, format) {
            Ok(decoded) => Ok(Attempt::Done(Value::Array(to_array(decoded)?))),
            Err(e) => decode_failure(self.name(), request.hint, e),
        }
    }

    fn save_stream(
        &self,
        value: &Value,
        sink: &mut dyn WriteStream,
        request: &SaveRequest<'_>,
    ) -> Result<Attempt<String>> {
        let Some(ext) = request.hint.and_then(last_extension) else {
            return Ok(Attempt::wrong_format("image needs a hint to pick an encoder"));
        };
        let Value::Array(array) = value else {
            return Ok(Attempt::wrong_format("image stores arrays only"));
        };
        let Some(format) = ImageFormat::from_extension(ext) else {
            return Ok(Attempt::wrong_format(format!("no image encoder for .{ext}")));
        };

        let mut encoded = Cursor::new(Vec::new());
        from_array(array)?
            .write_to(&mut encoded, format)
            .map_err(|e| encode_error(self.name(), e))?;
        sink.write_all(encoded.get_ref())
            .and_then(|()| sink.flush())
            .map_err(|e| Error::io("write image", e))?;
        Ok(Attempt::Done(format!(".{}", ext.to_ascii_lowercase())))
    }
}
