use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::error::ElevationError;
use crate::sample::{ElevationOrigin, ElevationSample, GeoPoint};
use crate::ElevationSampler;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const GEO_KEY_MODEL_TYPE: u32 = 1024;
const MODEL_TYPE_PROJECTED: u32 = 1;

/// A digital elevation model backed by a single-band GeoTIFF loaded once
/// and kept in memory for the lifetime of the run.
///
/// The raster must carry ModelPixelScale and ModelTiepoint keys and use
/// geographic (longitude/latitude) axes; queries outside the raster or
/// hitting nodata cells resolve as unavailable. Sampling is read-only, so a
/// loaded instance is shared freely across worker threads.
#[derive(Debug)]
pub struct DemRaster {
    data: Array2<f32>,
    origin_x: f64,
    origin_y: f64,
    pixel_size_x: f64,
    pixel_size_y: f64,
    nodata: Option<f32>,
}

impl DemRaster {
    /// Load a DEM from a GeoTIFF file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ElevationError> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let mut decoder = Decoder::new(file)?;

        let (width, height) = decoder.dimensions()?;
        log::info!("loading DEM {} ({width}x{height})", path.display());

        let scale = decoder
            .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE))
            .map_err(|_| ElevationError::NotGeoreferenced(PathBuf::from(path)))?;
        let tiepoint = decoder
            .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT))
            .map_err(|_| ElevationError::NotGeoreferenced(PathBuf::from(path)))?;
        if scale.len() < 2 || tiepoint.len() < 5 {
            return Err(ElevationError::NotGeoreferenced(PathBuf::from(path)));
        }

        if let Ok(keys) = decoder.get_tag_u32_vec(Tag::Unknown(TAG_GEO_KEY_DIRECTORY)) {
            if model_type(&keys) == Some(MODEL_TYPE_PROJECTED) {
                return Err(ElevationError::UnsupportedDem(
                    "projected-CRS DEMs are not supported; supply a geographic raster".into(),
                ));
            }
        }

        let nodata = decoder
            .get_tag_ascii_string(Tag::Unknown(TAG_GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim().parse::<f32>().ok());

        // Tiepoint maps raster (i, j) onto model (x, y); y shrinks row-wise.
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];

        let data = decode_band(&mut decoder, width as usize, height as usize)?;

        Ok(Self {
            data,
            origin_x,
            origin_y,
            pixel_size_x: scale[0],
            pixel_size_y: scale[1],
            nodata,
        })
    }

    /// Build a DEM from raw parts. Intended for synthetic terrain in tests
    /// and for callers that already hold a decoded grid.
    pub fn from_parts(
        data: Array2<f32>,
        origin_x: f64,
        origin_y: f64,
        pixel_size_x: f64,
        pixel_size_y: f64,
        nodata: Option<f32>,
    ) -> Self {
        Self {
            data,
            origin_x,
            origin_y,
            pixel_size_x,
            pixel_size_y,
            nodata,
        }
    }

    /// Raster rows and columns.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

fn model_type(keys: &[u32]) -> Option<u32> {
    // GeoKeyDirectory header is 4 shorts, then 4-short key entries of
    // (key id, tag location, count, value).
    keys.get(4..)
        .unwrap_or(&[])
        .chunks_exact(4)
        .find(|entry| entry[0] == GEO_KEY_MODEL_TYPE && entry[1] == 0)
        .map(|entry| entry[3])
}

fn decode_band(
    decoder: &mut Decoder<BufReader<File>>,
    width: usize,
    height: usize,
) -> Result<Array2<f32>, ElevationError> {
    let values: Vec<f32> = match decoder.read_image()? {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => {
            return Err(ElevationError::UnsupportedDem(
                "unsupported DEM sample format".into(),
            ))
        }
    };

    if values.len() != width * height {
        // More than one sample per pixel means a multi-band raster.
        return Err(ElevationError::UnsupportedDem(format!(
            "expected a single-band raster, got {} samples for {}x{} pixels",
            values.len(),
            width,
            height
        )));
    }

    Array2::from_shape_vec((height, width), values)
        .map_err(|e| ElevationError::UnsupportedDem(e.to_string()))
}

impl ElevationSampler for DemRaster {
    fn sample(&self, point: GeoPoint) -> ElevationSample {
        let col = (point.lon - self.origin_x) / self.pixel_size_x;
        let row = (self.origin_y - point.lat) / self.pixel_size_y;
        let (rows, cols) = self.data.dim();

        if col < 0.0 || row < 0.0 {
            return ElevationSample::unavailable(point, ElevationOrigin::Raster);
        }
        let (col, row) = (col as usize, row as usize);
        if col >= cols || row >= rows {
            return ElevationSample::unavailable(point, ElevationOrigin::Raster);
        }

        let value = self.data[(row, col)];
        let is_nodata = value.is_nan() || self.nodata.is_some_and(|nd| value == nd);
        if is_nodata {
            return ElevationSample::unavailable(point, ElevationOrigin::Raster);
        }
        ElevationSample::resolved(point, f64::from(value), ElevationOrigin::Raster)
    }
}
