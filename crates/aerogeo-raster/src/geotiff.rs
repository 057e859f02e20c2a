//! GeoTIFF output.
//!
//! Writes the warped grid with its geotransform and CRS embedded as GeoTIFF
//! keys. Cloud-optimized mode appends a factor-2 overview pyramid as
//! reduced-resolution IFDs and bounds strip sizes so remote readers can
//! fetch the file piecewise. Output is written to a temporary sibling path
//! and renamed into place, so a failed write leaves nothing behind.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use crate::error::RasterError;
use crate::grid::{GridSize, PixelGrid};

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const GEO_KEY_MODEL_TYPE: u16 = 1024;
const GEO_KEY_RASTER_TYPE: u16 = 1025;
const GEO_KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const GEO_KEY_PROJECTED_CS_TYPE: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_TYPE_PIXEL_IS_AREA: u16 = 1;

/// Smallest overview dimension kept in a cloud-optimized pyramid.
const MIN_OVERVIEW_DIM: usize = 256;
/// Strip size budget in bytes for cloud-optimized output.
const STRIP_BYTE_BUDGET: usize = 256 * 1024;

/// Output options for the GeoTIFF writer.
#[derive(Debug, Clone, Copy)]
pub struct GeoTiffOptions {
    /// EPSG code recorded in the GeoTIFF keys.
    pub epsg: u32,
    /// Whether the CRS is geographic (degrees) rather than projected.
    pub geographic: bool,
    /// Write an overview pyramid and bounded strips.
    pub cloud_optimized: bool,
    /// Pixel value recorded as nodata, if any.
    pub nodata: Option<f32>,
}

/// Write an RGB grid as a GeoTIFF.
pub fn write_geotiff_rgb8(
    path: impl AsRef<Path>,
    grid: &PixelGrid<u8, 3>,
    geotransform: [f64; 6],
    options: &GeoTiffOptions,
) -> Result<(), RasterError> {
    write_geotiff_impl::<colortype::RGB8, 3>(path.as_ref(), grid, geotransform, options)
}

/// Write a single-band grid as a GeoTIFF.
pub fn write_geotiff_mono8(
    path: impl AsRef<Path>,
    grid: &PixelGrid<u8, 1>,
    geotransform: [f64; 6],
    options: &GeoTiffOptions,
) -> Result<(), RasterError> {
    write_geotiff_impl::<colortype::Gray8, 1>(path.as_ref(), grid, geotransform, options)
}

fn write_geotiff_impl<K, const C: usize>(
    path: &Path,
    grid: &PixelGrid<u8, C>,
    geotransform: [f64; 6],
    options: &GeoTiffOptions,
) -> Result<(), RasterError>
where
    K: colortype::ColorType<Inner = u8>,
{
    let tmp_path = temp_sibling(path);
    if let Err(err) = write_levels::<K, C>(&tmp_path, grid, geotransform, options) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_levels<K, const C: usize>(
    tmp_path: &Path,
    grid: &PixelGrid<u8, C>,
    geotransform: [f64; 6],
    options: &GeoTiffOptions,
) -> Result<(), RasterError>
where
    K: colortype::ColorType<Inner = u8>,
{
    let file = File::create(tmp_path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;

    encode_level::<K, C>(&mut encoder, grid, false, geotransform, options)?;

    if options.cloud_optimized {
        let mut current = grid.clone();
        while current.cols().max(current.rows()) > MIN_OVERVIEW_DIM {
            current = downsample_half(&current);
            encode_level::<K, C>(&mut encoder, &current, true, geotransform, options)?;
        }
    }
    Ok(())
}

fn encode_level<K, const C: usize>(
    encoder: &mut TiffEncoder<BufWriter<File>>,
    grid: &PixelGrid<u8, C>,
    is_overview: bool,
    geotransform: [f64; 6],
    options: &GeoTiffOptions,
) -> Result<(), RasterError>
where
    K: colortype::ColorType<Inner = u8>,
{
    let mut image = encoder.new_image::<K>(grid.cols() as u32, grid.rows() as u32)?;

    if is_overview {
        // Reduced-resolution subfile.
        image.encoder().write_tag(Tag::NewSubfileType, 1_u32)?;
    } else {
        let [origin_x, pixel_w, _, origin_y, _, neg_pixel_h] = geotransform;
        image.encoder().write_tag(
            Tag::Unknown(TAG_MODEL_PIXEL_SCALE),
            &[pixel_w, -neg_pixel_h, 0.0][..],
        )?;
        image.encoder().write_tag(
            Tag::Unknown(TAG_MODEL_TIEPOINT),
            &[0.0, 0.0, 0.0, origin_x, origin_y, 0.0][..],
        )?;

        let (model_type, cs_key) = if options.geographic {
            (MODEL_TYPE_GEOGRAPHIC, GEO_KEY_GEOGRAPHIC_TYPE)
        } else {
            (MODEL_TYPE_PROJECTED, GEO_KEY_PROJECTED_CS_TYPE)
        };
        #[rustfmt::skip]
        let keys: [u16; 16] = [
            1, 1, 0, 3,
            GEO_KEY_MODEL_TYPE, 0, 1, model_type,
            GEO_KEY_RASTER_TYPE, 0, 1, RASTER_TYPE_PIXEL_IS_AREA,
            cs_key, 0, 1, options.epsg as u16,
        ];
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), &keys[..])?;

        if let Some(nodata) = options.nodata {
            image
                .encoder()
                .write_tag(Tag::Unknown(TAG_GDAL_NODATA), format!("{nodata}").as_str())?;
        }
    }

    if options.cloud_optimized {
        let row_bytes = grid.cols() * C;
        let rows = (STRIP_BYTE_BUDGET / row_bytes.max(1)).clamp(1, grid.rows().max(1));
        image.rows_per_strip(rows as u32)?;
    }

    image.write_data(grid.as_slice())?;
    Ok(())
}

/// Box-filter downsample by a factor of two in each axis.
fn downsample_half<const C: usize>(grid: &PixelGrid<u8, C>) -> PixelGrid<u8, C> {
    let out_w = (grid.cols() + 1) / 2;
    let out_h = (grid.rows() + 1) / 2;
    let mut out = PixelGrid::<u8, C>::from_size_val(
        GridSize {
            width: out_w,
            height: out_h,
        },
        0,
    );

    let src = grid.as_slice();
    let (cols, rows) = (grid.cols(), grid.rows());
    let dst = out.as_slice_mut();
    for oy in 0..out_h {
        for ox in 0..out_w {
            let x0 = ox * 2;
            let y0 = oy * 2;
            let x1 = (x0 + 1).min(cols - 1);
            let y1 = (y0 + 1).min(rows - 1);
            for ch in 0..C {
                let sum = u16::from(src[(y0 * cols + x0) * C + ch])
                    + u16::from(src[(y0 * cols + x1) * C + ch])
                    + u16::from(src[(y1 * cols + x0) * C + ch])
                    + u16::from(src[(y1 * cols + x1) * C + ch]);
                dst[(oy * out_w + ox) * C + ch] = (sum / 4) as u8;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::decoder::{Decoder, DecodingResult};

    fn checker(width: usize, height: usize) -> PixelGrid<u8, 3> {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v / 2, 30]);
            }
        }
        PixelGrid::new(GridSize { width, height }, data).unwrap()
    }

    fn options(cog: bool) -> GeoTiffOptions {
        GeoTiffOptions {
            epsg: 4326,
            geographic: true,
            cloud_optimized: cog,
            nodata: Some(0.0),
        }
    }

    const GEO: [f64; 6] = [-122.01, 0.0001, 0.0, 45.01, 0.0, -0.0001];

    #[test]
    fn writes_pixels_and_geo_tags() -> Result<(), RasterError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("out.tif");
        let grid = checker(8, 4);

        write_geotiff_rgb8(&path, &grid, GEO, &options(false))?;

        let mut decoder = Decoder::new(File::open(&path)?).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (8, 4));

        let scale = decoder
            .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE))
            .unwrap();
        assert_eq!(scale, vec![0.0001, 0.0001, 0.0]);
        let tie = decoder
            .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT))
            .unwrap();
        assert_eq!(&tie[3..5], &[-122.01, 45.01]);

        let keys = decoder
            .get_tag_u32_vec(Tag::Unknown(TAG_GEO_KEY_DIRECTORY))
            .unwrap();
        assert!(keys
            .chunks_exact(4)
            .any(|k| k[0] == u32::from(GEO_KEY_GEOGRAPHIC_TYPE) && k[3] == 4326));

        match decoder.read_image().unwrap() {
            DecodingResult::U8(data) => assert_eq!(data, grid.as_slice()),
            _ => panic!("expected 8-bit decoding result"),
        }
        Ok(())
    }

    #[test]
    fn projected_output_records_projected_keys() -> Result<(), RasterError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("utm.tif");
        let opts = GeoTiffOptions {
            epsg: 32610,
            geographic: false,
            cloud_optimized: false,
            nodata: None,
        };
        write_geotiff_rgb8(&path, &checker(4, 4), GEO, &opts)?;

        let mut decoder = Decoder::new(File::open(&path)?).unwrap();
        let keys = decoder
            .get_tag_u32_vec(Tag::Unknown(TAG_GEO_KEY_DIRECTORY))
            .unwrap();
        assert!(keys
            .chunks_exact(4)
            .any(|k| k[0] == u32::from(GEO_KEY_PROJECTED_CS_TYPE) && k[3] == 32610));
        Ok(())
    }

    #[test]
    fn cloud_optimized_carries_overviews() -> Result<(), RasterError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cog.tif");
        // 600 px wide: one overview level brings it to 300, a second to 150.
        write_geotiff_rgb8(&path, &checker(600, 20), GEO, &options(true))?;

        let mut decoder = Decoder::new(File::open(&path)?).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (600, 20));

        assert!(decoder.more_images());
        decoder.next_image().unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (300, 10));

        assert!(decoder.more_images());
        decoder.next_image().unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (150, 5));
        assert!(!decoder.more_images());
        Ok(())
    }

    #[test]
    fn mono8_roundtrip() -> Result<(), RasterError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("mono.tif");

        let data: Vec<u8> = (0..12).collect();
        let grid = PixelGrid::<u8, 1>::new(
            GridSize {
                width: 4,
                height: 3,
            },
            data,
        )?;
        write_geotiff_mono8(&path, &grid, GEO, &options(false))?;

        let mut decoder = Decoder::new(File::open(&path)?).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (4, 3));
        match decoder.read_image().unwrap() {
            DecodingResult::U8(data) => assert_eq!(data, grid.as_slice()),
            _ => panic!("expected 8-bit decoding result"),
        }
        Ok(())
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let missing_dir = Path::new("/definitely/not/a/dir/out.tif");
        let err = write_geotiff_rgb8(missing_dir, &checker(2, 2), GEO, &options(false));
        assert!(matches!(err, Err(RasterError::Write(_))));
    }

    #[test]
    fn rename_cleans_up_temp_file() -> Result<(), RasterError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("clean.tif");
        write_geotiff_rgb8(&path, &checker(4, 4), GEO, &options(false))?;
        assert!(path.exists());
        assert!(!temp_sibling(&path).exists());
        Ok(())
    }

    #[test]
    fn downsample_halves_dimensions() {
        let grid = checker(5, 4);
        let half = downsample_half(&grid);
        assert_eq!(half.cols(), 3);
        assert_eq!(half.rows(), 2);
    }
}
