//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate directly, no GDAL dependency. Reads the
//! ModelPixelScale/ModelTiepoint tags to recover the geotransform and
//! writes them back out; everything else (projections, compression) is
//! out of scope.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::any::TypeId;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray16, Gray32, Gray32Float, Gray8, GrayI8};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

/// ModelPixelScaleTag
const TAG_PIXEL_SCALE: u16 = 33550;
/// ModelTiepointTag
const TAG_TIEPOINT: u16 = 33922;
/// GeoKeyDirectoryTag
const TAG_GEOKEYS: u16 = 34735;

/// Read a single-band GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a single-band GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Tiff(format!("decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Tiff(format!("cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Tiff(format!("cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => cast_buffer(&buf),
        DecodingResult::U16(buf) => cast_buffer(&buf),
        DecodingResult::U32(buf) => cast_buffer(&buf),
        DecodingResult::I8(buf) => cast_buffer(&buf),
        DecodingResult::I16(buf) => cast_buffer(&buf),
        DecodingResult::I32(buf) => cast_buffer(&buf),
        DecodingResult::F32(buf) => cast_buffer(&buf),
        DecodingResult::F64(buf) => cast_buffer(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }

    Ok(raster)
}

fn cast_buffer<S, T>(buf: &[S]) -> Vec<T>
where
    S: Copy + num_traits::NumCast,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Recover the geotransform from ModelPixelScale + ModelTiepoint tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_PIXEL_SCALE))
        .map_err(|_| Error::Tiff("no pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_TIEPOINT))
        .map_err(|_| Error::Tiff("no tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];

        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Tiff("cannot determine geotransform".into()))
}

/// Write a Raster to a GeoTIFF file.
///
/// The sample format follows the element type: `i8`/`u8` classification
/// and probability grids are written as 8-bit, `u16`/`u32` as matching
/// unsigned integers, and everything else as 32-bit float.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file)
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let id = TypeId::of::<T>();
    if id == TypeId::of::<i8>() {
        encode_as::<T, GrayI8, W>(raster, writer)
    } else if id == TypeId::of::<u8>() {
        encode_as::<T, Gray8, W>(raster, writer)
    } else if id == TypeId::of::<u16>() {
        encode_as::<T, Gray16, W>(raster, writer)
    } else if id == TypeId::of::<u32>() {
        encode_as::<T, Gray32, W>(raster, writer)
    } else {
        encode_as::<T, Gray32Float, W>(raster, writer)
    }
}

fn encode_as<T, C, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    C: ColorType,
    C::Inner: RasterElement,
    [C::Inner]: TiffValue,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Tiff(format!("encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<C::Inner> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(C::Inner::default_nodata()))
        .collect();

    let mut image = encoder
        .new_image::<C>(cols as u32, rows as u32)
        .map_err(|e| Error::Tiff(format!("cannot create image: {}", e)))?;

    let gt = raster.transform();

    let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_PIXEL_SCALE), scale.as_slice())
        .map_err(|e| Error::Tiff(format!("cannot write scale tag: {}", e)))?;

    let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_TIEPOINT), tiepoint.as_slice())
        .map_err(|e| Error::Tiff(format!("cannot write tiepoint tag: {}", e)))?;

    // Minimal GeoKeyDirectory: projected model, pixel-is-area
    let geokeys: Vec<u16> = vec![
        1, 1, 0, 2, //
        1024, 0, 1, 1, //
        1025, 0, 1, 1, //
    ];
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_GEOKEYS), geokeys.as_slice())
        .map_err(|e| Error::Tiff(format!("cannot write geokey tag: {}", e)))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Tiff(format!("cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_buffer_roundtrip() {
        let mut raster: Raster<f64> = Raster::new(8, 6);
        raster.set_transform(GeoTransform::new(300000.0, 4600000.0, 30.0, -30.0));
        for row in 0..8 {
            for col in 0..6 {
                raster.set(row, col, (row * 6 + col) as f64).unwrap();
            }
        }

        let buf = write_geotiff_to_buffer(&raster).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.shape(), (8, 6));
        assert_relative_eq!(back.get(3, 4).unwrap(), 22.0, epsilon = 1e-6);
        assert_relative_eq!(back.transform().origin_x, 300000.0, epsilon = 1e-6);
        assert_relative_eq!(back.transform().pixel_height, -30.0, epsilon = 1e-6);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.tif");

        let raster: Raster<u16> = Raster::filled(4, 4, 320);
        write_geotiff(&raster, &path).unwrap();

        let back: Raster<u16> = read_geotiff(&path).unwrap();
        assert_eq!(back.get(2, 2).unwrap(), 320);
    }

    #[test]
    fn test_classification_values_survive() {
        // i8 class codes, including the -1 fill value
        let mut classes: Raster<i8> = Raster::filled(3, 3, 0);
        classes.set(0, 0, -1).unwrap();
        classes.set(1, 1, 9).unwrap();

        let buf = write_geotiff_to_buffer(&classes).unwrap();
        let back: Raster<i8> = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.get(0, 0).unwrap(), -1);
        assert_eq!(back.get(1, 1).unwrap(), 9);
        assert_eq!(back.get(2, 2).unwrap(), 0);
    }

    #[test]
    fn test_classification_grid_written_as_signed_8bit() {
        let mut classes: Raster<i8> = Raster::filled(3, 3, 0);
        classes.set(0, 0, -1).unwrap();

        let buf = write_geotiff_to_buffer(&classes).unwrap();
        let mut decoder = Decoder::new(Cursor::new(&buf[..])).unwrap();
        let result = decoder.read_image().unwrap();

        assert!(
            matches!(result, DecodingResult::I8(_)),
            "class grid must keep 8-bit signed samples"
        );
    }

    #[test]
    fn test_probability_grid_written_as_unsigned_8bit() {
        let probs: Raster<u8> = Raster::filled(3, 3, 100);

        let buf = write_geotiff_to_buffer(&probs).unwrap();
        let mut decoder = Decoder::new(Cursor::new(&buf[..])).unwrap();
        let result = decoder.read_image().unwrap();

        assert!(matches!(result, DecodingResult::U8(_)));
    }

    #[test]
    fn test_float_band_written_as_32bit_float() {
        let band: Raster<f64> = Raster::filled(2, 2, 1500.0);

        let buf = write_geotiff_to_buffer(&band).unwrap();
        let mut decoder = Decoder::new(Cursor::new(&buf[..])).unwrap();
        let result = decoder.read_image().unwrap();

        assert!(matches!(result, DecodingResult::F32(_)));
    }

    #[test]
    fn test_garbage_input() {
        let result: Result<Raster<f64>> = read_geotiff_from_buffer(b"not a tiff");
        assert!(result.is_err());
    }
}
