use crate::cache::CompressCache;
use crate::dispatch::TaskDispatcher;
use crate::error::CompressError;
use crate::exif;
use crate::filter::is_file_valid;
use crate::models::ImageItem;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Byte budget applied to extreme-ratio images regardless of the caller's
/// budget.
const EXTREME_RATIO_BUDGET: u64 = 1024 * 1024;
/// Quality floor for the extreme-ratio branch.
const EXTREME_QUALITY_FLOOR: u8 = 50;
/// Quality floor for the tiered branch.
const NORMAL_QUALITY_FLOOR: u8 = 20;
const QUALITY_START: u8 = 90;
const QUALITY_STEP: u8 = 10;
const SAVE_QUALITY: u8 = 100;
/// Extreme-ratio images are halved only above this size.
const LARGE_WIDTH: u32 = 3024;
const LARGE_HEIGHT: u32 = 4032;

/// Produces size-bounded JPEG copies of catalog images.
///
/// Work runs on the dispatcher's worker pool; the async `compress` resolves
/// when the worker finishes, and `compress_blocking` bridges that for
/// synchronous callers with an optional wait limit.
///
/// Concurrent compressions of the same source race benignly: both derive the
/// same output path, the last writer wins and both calls report success.
#[derive(Clone)]
pub struct ImageCompressor {
    cache: CompressCache,
    dispatch: TaskDispatcher,
}

impl ImageCompressor {
    /// `cache_dir` is the caller's cache root; output files live in a
    /// `.compress` directory beneath it, created lazily.
    pub fn new(cache_dir: &Path, dispatch: TaskDispatcher) -> Self {
        Self {
            cache: CompressCache::new(cache_dir),
            dispatch,
        }
    }

    pub fn cache(&self) -> &CompressCache {
        &self.cache
    }

    /// Compress `image` down to at most `max_size_bytes`, updating its
    /// compressed path.
    ///
    /// A cached output is returned immediately. When the item's *recorded*
    /// size is already under budget the source itself becomes the result:
    /// no file is written, and the compressed path then aliases the
    /// original. Use [`CompressCache::owns`] before deleting compressed
    /// artifacts as temporaries.
    ///
    /// The back-off loop may stop at its floor quality without meeting the
    /// budget; callers needing a hard guarantee must check the output size.
    /// Any failure clears the item's compressed path.
    pub async fn compress(
        &self,
        image: &mut ImageItem,
        max_size_bytes: u64,
    ) -> Result<PathBuf, CompressError> {
        if max_size_bytes == 0 {
            image.compressed_path.clear();
            return Err(CompressError::InvalidInput(
                "byte budget must be positive".to_string(),
            ));
        }
        if let Some(cached) = self.cache.lookup(&image.path) {
            log::debug!("compress cache hit: {}", cached.display());
            image.compressed_path = cached.to_string_lossy().into_owned();
            return Ok(cached);
        }
        if !is_file_valid(Path::new(&image.path)) {
            image.compressed_path.clear();
            return Err(CompressError::InvalidInput(format!(
                "file not found: {}",
                image.path
            )));
        }
        if image.size_bytes() < max_size_bytes {
            image.compressed_path = image.path.clone();
            return Ok(PathBuf::from(&image.path));
        }

        let cache = self.cache.clone();
        let source_path = image.path.clone();
        let joined = self
            .dispatch
            .run_worker(move || run_pipeline(&cache, &source_path, max_size_bytes))
            .await;
        match joined {
            Ok(Ok(out_path)) => {
                log::debug!("compress done: {}", out_path.display());
                image.compressed_path = out_path.to_string_lossy().into_owned();
                Ok(out_path)
            }
            Ok(Err(e)) => {
                log::debug!("image compress failed: {}", e);
                image.compressed_path.clear();
                Err(e)
            }
            Err(e) => {
                image.compressed_path.clear();
                Err(CompressError::Decode(format!(
                    "compression worker terminated: {}",
                    e
                )))
            }
        }
    }

    /// Synchronous bridge for callers outside the runtime. With `wait`
    /// unset this blocks until the worker finishes; with a limit, a stalled
    /// worker yields [`CompressError::Timeout`] while the underlying work
    /// still runs to completion.
    pub fn compress_blocking(
        &self,
        image: &mut ImageItem,
        max_size_bytes: u64,
        wait: Option<Duration>,
    ) -> Result<PathBuf, CompressError> {
        let handle = self.dispatch.runtime().clone();
        match wait {
            None => handle.block_on(self.compress(image, max_size_bytes)),
            Some(limit) => {
                let outcome = {
                    let image = &mut *image;
                    handle.block_on(async {
                        tokio::time::timeout(limit, self.compress(image, max_size_bytes)).await
                    })
                };
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        image.compressed_path.clear();
                        Err(CompressError::Timeout(limit))
                    }
                }
            }
        }
    }
}

/// Full decode/resize/rotate/encode pipeline, executed on a worker.
fn run_pipeline(
    cache: &CompressCache,
    source_path: &str,
    max_size_bytes: u64,
) -> Result<PathBuf, CompressError> {
    cache.ensure_root()?;
    let out_path = cache.out_path(source_path);
    let source = Path::new(source_path);

    let (width, height) = probe_bounds(source)?;
    let angle = exif::rotation_degrees(source);
    let decoded = image::open(source)
        .map_err(|e| CompressError::Decode(format!("cannot decode {}: {}", source_path, e)))?;
    // Output is always JPEG; drop any alpha up front.
    let decoded = DynamicImage::ImageRgb8(decoded.to_rgb8());

    if is_extreme_ratio(width, height) {
        let scaled = if width >= LARGE_WIDTH && height >= LARGE_HEIGHT {
            decoded.resize_exact(width / 2, height / 2, FilterType::Lanczos3)
        } else {
            decoded
        };
        let rotated = apply_rotation(scaled, angle);
        write_jpeg(&rotated, &out_path, SAVE_QUALITY)?;
        backoff_quality(&rotated, &out_path, EXTREME_RATIO_BUDGET, EXTREME_QUALITY_FLOOR)?;
    } else {
        let (target_width, target_height) = target_dimensions(width, height);
        let scaled = if target_width < width || target_height < height {
            decoded.resize_exact(target_width, target_height, FilterType::Lanczos3)
        } else {
            decoded
        };
        let rotated = apply_rotation(scaled, angle);
        write_jpeg(&rotated, &out_path, SAVE_QUALITY)?;
        backoff_quality(&rotated, &out_path, max_size_bytes, NORMAL_QUALITY_FLOOR)?;
    }
    Ok(out_path)
}

/// Decode bounds only, without a pixel buffer.
fn probe_bounds(path: &Path) -> Result<(u32, u32), CompressError> {
    let reader = image::ImageReader::open(path)
        .map_err(|e| CompressError::InvalidInput(format!("cannot open {}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| {
            CompressError::InvalidInput(format!("cannot probe {}: {}", path.display(), e))
        })?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| CompressError::Decode(format!("cannot read image bounds: {}", e)))?;
    if width == 0 || height == 0 {
        return Err(CompressError::InvalidInput(
            "image has zero width or height".to_string(),
        ));
    }
    Ok((width, height))
}

/// One side at least three times the other.
fn is_extreme_ratio(width: u32, height: u32) -> bool {
    width.max(height) >= 3 * width.min(height)
}

/// Tiered target for the normal branch.
///
/// Dimensions are rounded up to even, then divided by a factor picked from
/// the short/long ratio and the long edge:
/// - ratio in [0.5625, 1]: unchanged under 1664, halved under 4990,
///   quartered under 10240, otherwise `long / 1280`;
/// - ratio in (0.5, 0.5625): unchanged under 1280, otherwise `long / 1280`;
/// - ratio <= 0.5: `ceil(long / (1280 / ratio))`.
fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    let even_width = width + width % 2;
    let even_height = height + height % 2;
    let short = even_width.min(even_height);
    let long = even_width.max(even_height);
    let scale = short as f64 / long as f64;

    let divisor: u32 = if scale >= 0.5625 {
        if long < 1664 {
            1
        } else if long < 4990 {
            2
        } else if long < 10240 {
            4
        } else {
            (long / 1280).max(1)
        }
    } else if scale > 0.5 {
        if long < 1280 {
            1
        } else {
            (long / 1280).max(1)
        }
    } else {
        ((long as f64 / (1280.0 / scale)).ceil() as u32).max(1)
    };

    (even_width / divisor, even_height / divisor)
}

fn apply_rotation(img: DynamicImage, angle: u32) -> DynamicImage {
    match angle {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => img,
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| CompressError::Decode(format!("jpeg encode failed: {}", e)))?;
    Ok(buffer)
}

fn write_jpeg(img: &DynamicImage, out_path: &Path, quality: u8) -> Result<(), CompressError> {
    let buffer = encode_jpeg(img, quality)?;
    std::fs::write(out_path, buffer).map_err(CompressError::CacheDir)
}

/// Re-encode at decreasing quality until the buffer fits the budget or the
/// floor is reached, then flush the last buffer to the output file. Entered
/// only when the freshly saved file is over budget; may finish at the floor
/// still over budget.
fn backoff_quality(
    img: &DynamicImage,
    out_path: &Path,
    max_size: u64,
    floor: u8,
) -> Result<(), CompressError> {
    let length = std::fs::metadata(out_path).map(|m| m.len()).unwrap_or(0);
    if length <= max_size {
        return Ok(());
    }
    let mut quality = QUALITY_START;
    loop {
        let buffer = encode_jpeg(img, quality)?;
        log::debug!(
            "re-encoded at quality {}: {} bytes (budget {})",
            quality,
            buffer.len(),
            max_size
        );
        if quality <= floor || (buffer.len() as u64) < max_size {
            return std::fs::write(out_path, buffer).map_err(CompressError::CacheDir);
        }
        quality -= QUALITY_STEP;
    }
}
