//! GeoTIFF reading/writing on top of the `tiff` crate
//!
//! Understands the subset of GeoTIFF that DEM providers emit: pixel scale +
//! tiepoint georeferencing, the EPSG code from the GeoKey directory, and the
//! GDAL_NODATA ASCII tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::F32(buf) => cast_samples(&buf),
        DecodingResult::F64(buf) => cast_samples(&buf),
        DecodingResult::U8(buf) => cast_samples(&buf),
        DecodingResult::U16(buf) => cast_samples(&buf),
        DecodingResult::U32(buf) => cast_samples(&buf),
        DecodingResult::I8(buf) => cast_samples(&buf),
        DecodingResult::I16(buf) => cast_samples(&buf),
        DecodingResult::I32(buf) => cast_samples(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    if data.len() != rows * cols {
        // Multi-band images decode interleaved samples
        return Err(Error::UnsupportedDataType(format!(
            "expected a single band of {}x{} samples, got {}",
            cols,
            rows,
            data.len()
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    let transform = read_geotransform(&mut decoder)?;
    raster.set_transform(transform);
    raster.set_crs(read_crs(&mut decoder));
    raster.set_nodata(read_nodata(&mut decoder).map(T::from_f64));

    Ok(raster)
}

fn cast_samples<S, T>(buf: &[S]) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast::<S, T>(v).unwrap_or_else(T::default_nodata))
        .collect()
}

/// Read the north-up GeoTransform from ModelTiepointTag + ModelPixelScaleTag
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(MODEL_PIXEL_SCALE)
        .map_err(|_| Error::MissingGeoreference("no ModelPixelScale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(MODEL_TIEPOINT)
        .map_err(|_| Error::MissingGeoreference("no ModelTiepoint tag".into()))?;

    GeoTransform::from_tiepoint(&tiepoint, &scale)
        .ok_or_else(|| Error::MissingGeoreference("malformed tiepoint or pixel scale".into()))
}

/// EPSG code from the GeoKey directory, if present
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY).ok()?;
    parse_geokeys(&keys)
}

fn parse_geokeys(keys: &[u16]) -> Option<CRS> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let inline_value = |key_id: u16| {
        keys[4..]
            .chunks_exact(4)
            .take(count)
            .find(|entry| entry[0] == key_id && entry[1] == 0)
            .map(|entry| entry[3])
    };

    // 32767 is the GeoTIFF "user-defined" marker
    let usable = |code: u16| code != 0 && code != 32767;

    if let Some(code) = inline_value(GEOGRAPHIC_TYPE_KEY).filter(|&c| usable(c)) {
        if inline_value(GT_MODEL_TYPE_KEY) != Some(MODEL_TYPE_PROJECTED) {
            return Some(CRS::geographic(code as u32));
        }
    }
    inline_value(PROJECTED_CS_TYPE_KEY)
        .filter(|&c| usable(c))
        .map(|code| CRS::projected(code as u32))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse::<f64>()
        .ok()
}

/// Write a Raster to a GeoTIFF file as 32-bit float samples
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, &mut Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: &mut W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;

    let (tiepoint, scale) = raster.transform().to_tiepoint();
    image.encoder().write_tag(MODEL_PIXEL_SCALE, &scale[..])?;
    image.encoder().write_tag(MODEL_TIEPOINT, &tiepoint[..])?;

    let geokeys = geokey_directory(raster.crs());
    image.encoder().write_tag(GEO_KEY_DIRECTORY, geokeys.as_slice())?;

    if let Some(nodata) = raster.nodata().and_then(|nd| nd.as_f64()) {
        let text = nodata.to_string();
        image.encoder().write_tag(GDAL_NODATA, text.as_str())?;
    }

    image.write_data(&data)?;
    Ok(())
}

fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let mut keys = vec![1, 1, 0, 2];
    match crs {
        Some(crs) if crs.is_geographic() => {
            keys.extend_from_slice(&[GT_MODEL_TYPE_KEY, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            keys.extend_from_slice(&[GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.extend_from_slice(&[GEOGRAPHIC_TYPE_KEY, 0, 1, crs.epsg() as u16]);
        }
        Some(crs) => {
            keys.extend_from_slice(&[GT_MODEL_TYPE_KEY, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.extend_from_slice(&[GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
            keys.extend_from_slice(&[PROJECTED_CS_TYPE_KEY, 0, 1, crs.epsg() as u16]);
        }
        None => {
            keys.extend_from_slice(&[GT_MODEL_TYPE_KEY, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.extend_from_slice(&[GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
        }
    }
    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}
