//! Upload preprocessor - size-gated downscale and re-encode
//!
//! Files at or below the byte threshold are passed through untouched. Larger
//! files are decoded, rendered at the longer-edge cap and re-encoded as JPEG on a
//! blocking worker. Every failure (decode, encode, empty output, timeout)
//! degrades to the original file so preprocessing can never block an upload.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{GenericImageView, ImageReader, Limits};
use pneumoscan_core::{PreprocessSettings, UploadFile};

use crate::compression::{JpegCompressor, RasterEncoder};
use crate::error::ProcessingError;
use crate::image::resize::{render, TargetDimensions};

/// Decoder dimension guard against decompression bombs
const MAX_DECODE_DIMENSION: u32 = 16_384;

/// Offset of the `DICM` magic in a DICOM Part 10 file
const DICOM_PREAMBLE_LEN: usize = 128;

/// Why the original file is uploaded as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassThroughReason {
    /// At or below the size threshold; nothing was decoded
    BelowThreshold,
    /// Payload is not a raster image (DICOM)
    NotRasterImage,
    /// Re-encoding was attempted and failed
    Failed(ProcessingError),
}

/// Result of preprocessing: the file to upload and how it was obtained.
#[derive(Debug, Clone)]
pub enum PreprocessOutcome {
    Original {
        file: UploadFile,
        reason: PassThroughReason,
    },
    Reencoded {
        file: UploadFile,
        source_dimensions: (u32, u32),
        dimensions: TargetDimensions,
        source_size: usize,
    },
}

impl PreprocessOutcome {
    pub fn file(&self) -> &UploadFile {
        match self {
            PreprocessOutcome::Original { file, .. } | PreprocessOutcome::Reencoded { file, .. } => {
                file
            }
        }
    }

    /// The file to attach to the upload.
    pub fn into_file(self) -> UploadFile {
        match self {
            PreprocessOutcome::Original { file, .. } | PreprocessOutcome::Reencoded { file, .. } => {
                file
            }
        }
    }

    pub fn is_reencoded(&self) -> bool {
        matches!(self, PreprocessOutcome::Reencoded { .. })
    }

    /// The swallowed failure, if re-encoding was attempted and failed.
    pub fn failure(&self) -> Option<&ProcessingError> {
        match self {
            PreprocessOutcome::Original {
                reason: PassThroughReason::Failed(err),
                ..
            } => Some(err),
            _ => None,
        }
    }
}

struct Encoded {
    data: Bytes,
    source_dimensions: (u32, u32),
    dimensions: TargetDimensions,
}

/// Size-gated image preprocessor. Cheap to clone; holds no per-call state.
#[derive(Clone)]
pub struct ImagePreprocessor {
    settings: PreprocessSettings,
    encoder: Arc<dyn RasterEncoder>,
}

impl std::fmt::Debug for ImagePreprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePreprocessor")
            .field("settings", &self.settings)
            .field("content_type", &self.encoder.content_type())
            .finish()
    }
}

impl ImagePreprocessor {
    pub fn new(settings: PreprocessSettings) -> Self {
        Self::with_encoder(settings, Arc::new(JpegCompressor))
    }

    pub fn with_encoder(settings: PreprocessSettings, encoder: Arc<dyn RasterEncoder>) -> Self {
        Self { settings, encoder }
    }

    pub fn settings(&self) -> &PreprocessSettings {
        &self.settings
    }

    /// Prepare a selected file for upload. Never fails: see [`PreprocessOutcome`].
    pub async fn preprocess(&self, file: UploadFile) -> PreprocessOutcome {
        let source_size = file.size();

        if source_size <= self.settings.size_threshold_bytes {
            tracing::debug!(
                file_name = %file.name,
                size_bytes = source_size,
                threshold_bytes = self.settings.size_threshold_bytes,
                "File below preprocessing threshold, uploading as-is"
            );
            return PreprocessOutcome::Original {
                file,
                reason: PassThroughReason::BelowThreshold,
            };
        }

        if is_dicom(&file.data) {
            tracing::debug!(file_name = %file.name, "DICOM payload, skipping raster preprocessing");
            return PreprocessOutcome::Original {
                file,
                reason: PassThroughReason::NotRasterImage,
            };
        }

        match self.reencode(&file).await {
            Ok(encoded) => {
                tracing::info!(
                    file_name = %file.name,
                    source_size,
                    encoded_size = encoded.data.len(),
                    source_width = encoded.source_dimensions.0,
                    source_height = encoded.source_dimensions.1,
                    width = encoded.dimensions.width,
                    height = encoded.dimensions.height,
                    "Re-encoded image for upload"
                );
                let replacement = file.replace_content(self.encoder.content_type(), encoded.data);
                PreprocessOutcome::Reencoded {
                    file: replacement,
                    source_dimensions: encoded.source_dimensions,
                    dimensions: encoded.dimensions,
                    source_size,
                }
            }
            Err(err) => {
                tracing::warn!(
                    file_name = %file.name,
                    size_bytes = source_size,
                    error = %err,
                    "Preprocessing failed, uploading original file"
                );
                PreprocessOutcome::Original {
                    file,
                    reason: PassThroughReason::Failed(err),
                }
            }
        }
    }

    async fn reencode(&self, file: &UploadFile) -> Result<Encoded, ProcessingError> {
        let data = file.data.clone();
        let encoder = Arc::clone(&self.encoder);
        let max_edge = self.settings.max_edge;
        let quality = self.settings.jpeg_quality;
        let timeout = self.settings.decode_timeout;

        // A timed-out worker keeps running to completion; its result is dropped.
        let task = tokio::task::spawn_blocking(move || {
            reencode_blocking(&data, max_edge, quality, encoder.as_ref())
        });

        match tokio::time::timeout(timeout, task).await {
            Err(_) => Err(ProcessingError::Timeout(timeout)),
            Ok(Err(join_err)) => Err(ProcessingError::TaskFailed(join_err.to_string())),
            Ok(Ok(result)) => result,
        }
    }
}

/// Decode, render at the capped size and encode. CPU-bound.
fn reencode_blocking(
    data: &[u8],
    max_edge: u32,
    quality: u8,
    encoder: &dyn RasterEncoder,
) -> Result<Encoded, ProcessingError> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProcessingError::Decode(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DECODE_DIMENSION);
    limits.max_image_height = Some(MAX_DECODE_DIMENSION);
    reader.limits(limits);

    let img = reader
        .decode()
        .map_err(|e| ProcessingError::Decode(e.to_string()))?;

    let source_dimensions = img.dimensions();
    let dimensions =
        TargetDimensions::fit_longer_edge(source_dimensions.0, source_dimensions.1, max_edge);

    // Rendering and encoding happen even when the size is unchanged, so every
    // qualifying upload ends up in the same compressed format.
    let rendered = render(img, dimensions);
    let data = encoder.encode(&rendered, quality)?;
    if data.is_empty() {
        return Err(ProcessingError::EmptyOutput);
    }

    Ok(Encoded {
        data,
        source_dimensions,
        dimensions,
    })
}

/// DICOM Part 10 files carry `DICM` right after a 128-byte preamble.
pub fn is_dicom(data: &[u8]) -> bool {
    data.get(DICOM_PREAMBLE_LEN..DICOM_PREAMBLE_LEN + 4) == Some(b"DICM".as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
    use image::{DynamicImage, ExtendedColorType, ImageEncoder};
    use std::time::Duration;

    /// Noise compresses poorly, so byte size tracks pixel count.
    fn noisy_png(width: u32, height: u32, color: ExtendedColorType) -> Bytes {
        let channels = match color {
            ExtendedColorType::L8 => 1,
            _ => 3,
        };
        let mut seed: u32 = 0x9e37_79b9;
        let pixels: Vec<u8> = (0..width as usize * height as usize * channels)
            .map(|_| {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (seed >> 24) as u8
            })
            .collect();

        let mut buffer = Vec::new();
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Fast, PngFilter::NoFilter)
            .write_image(&pixels, width, height, color)
            .unwrap();
        Bytes::from(buffer)
    }

    fn upload(name: &str, content_type: &str, data: Bytes) -> UploadFile {
        UploadFile::new(name, content_type, data)
    }

    fn settings_with_threshold(size_threshold_bytes: usize) -> PreprocessSettings {
        PreprocessSettings {
            size_threshold_bytes,
            ..PreprocessSettings::default()
        }
    }

    struct FailingEncoder;

    impl RasterEncoder for FailingEncoder {
        fn content_type(&self) -> &'static str {
            "image/jpeg"
        }

        fn encode(&self, _img: &DynamicImage, _quality: u8) -> Result<Bytes, ProcessingError> {
            Err(ProcessingError::Encode("encoder unavailable".to_string()))
        }
    }

    struct EmptyEncoder;

    impl RasterEncoder for EmptyEncoder {
        fn content_type(&self) -> &'static str {
            "image/jpeg"
        }

        fn encode(&self, _img: &DynamicImage, _quality: u8) -> Result<Bytes, ProcessingError> {
            Ok(Bytes::new())
        }
    }

    struct PanickingEncoder;

    impl RasterEncoder for PanickingEncoder {
        fn content_type(&self) -> &'static str {
            "image/jpeg"
        }

        fn encode(&self, _img: &DynamicImage, _quality: u8) -> Result<Bytes, ProcessingError> {
            panic!("draw threw")
        }
    }

    struct SlowEncoder(Duration);

    impl RasterEncoder for SlowEncoder {
        fn content_type(&self) -> &'static str {
            "image/jpeg"
        }

        fn encode(&self, img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
            std::thread::sleep(self.0);
            JpegCompressor.encode(img, quality)
        }
    }

    #[tokio::test]
    async fn test_small_png_is_returned_untouched() {
        let data = noisy_png(400, 300, ExtendedColorType::Rgb8);
        assert!(data.len() <= 1024 * 1024);
        let file = upload("small.png", "image/png", data);

        let preprocessor = ImagePreprocessor::new(PreprocessSettings::default());
        let outcome = preprocessor.preprocess(file.clone()).await;

        assert!(matches!(
            outcome,
            PreprocessOutcome::Original {
                reason: PassThroughReason::BelowThreshold,
                ..
            }
        ));
        assert_eq!(outcome.into_file(), file);
    }

    #[tokio::test]
    async fn test_gate_is_inclusive() {
        let data = Bytes::from(vec![0u8; 2048]);
        let file = upload("edge.png", "image/png", data);

        let preprocessor = ImagePreprocessor::new(settings_with_threshold(2048));
        let outcome = preprocessor.preprocess(file.clone()).await;

        assert!(!outcome.is_reencoded());
        assert!(outcome.failure().is_none());
        assert_eq!(outcome.file(), &file);
    }

    #[tokio::test]
    async fn test_below_threshold_is_idempotent() {
        let file = upload("small.png", "image/png", noisy_png(64, 64, ExtendedColorType::L8));
        let preprocessor = ImagePreprocessor::new(PreprocessSettings::default());

        let first = preprocessor.preprocess(file.clone()).await.into_file();
        let second = preprocessor.preprocess(first.clone()).await.into_file();

        assert_eq!(first, file);
        assert_eq!(second, file);
    }

    #[tokio::test]
    async fn test_large_landscape_is_downscaled_to_800() {
        let data = noisy_png(2400, 1600, ExtendedColorType::L8);
        assert!(data.len() > 3 * 1024 * 1024);
        let file = upload("chest_pa.png", "image/png", data);
        let source_size = file.size();

        let preprocessor = ImagePreprocessor::new(PreprocessSettings::default());
        let outcome = preprocessor.preprocess(file.clone()).await;

        match &outcome {
            PreprocessOutcome::Reencoded {
                file: encoded,
                source_dimensions,
                dimensions,
                source_size: reported_size,
            } => {
                assert_eq!(*source_dimensions, (2400, 1600));
                assert_eq!(dimensions.as_tuple(), (800, 533));
                assert_eq!(*reported_size, source_size);
                assert_eq!(encoded.name, "chest_pa.png");
                assert_eq!(encoded.content_type, "image/jpeg");
                assert!(encoded.last_modified >= file.last_modified);

                let decoded = image::load_from_memory(&encoded.data).unwrap();
                assert_eq!(decoded.dimensions(), (800, 533));
            }
            other => panic!("expected re-encoded output, got {:?}", other),
        }
    }

    /// Noise at maximum quality keeps the JPEG close to its raw size.
    fn noisy_jpeg(width: u32, height: u32) -> Bytes {
        let mut seed: u32 = 0x85eb_ca6b;
        let img = image::RgbImage::from_fn(width, height, |_, _| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let v = (seed >> 24) as u8;
            image::Rgb([v, v.wrapping_mul(3), v.wrapping_add(97)])
        });
        let mut buffer = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, 100)
            .encode_image(&img)
            .unwrap();
        Bytes::from(buffer)
    }

    #[tokio::test]
    async fn test_large_jpeg_is_downscaled_and_reencoded() {
        let data = noisy_jpeg(2400, 1600);
        assert!(data.len() > 1024 * 1024);
        let file = upload("chest_pa.jpg", "image/jpeg", data);
        let source_size = file.size();

        let outcome = ImagePreprocessor::new(PreprocessSettings::default())
            .preprocess(file)
            .await;

        match outcome {
            PreprocessOutcome::Reencoded {
                file: encoded,
                source_dimensions,
                dimensions,
                ..
            } => {
                assert_eq!(source_dimensions, (2400, 1600));
                assert_eq!(dimensions.as_tuple(), (800, 533));
                assert_eq!(encoded.name, "chest_pa.jpg");
                assert_eq!(encoded.content_type, "image/jpeg");
                assert!(encoded.size() < source_size);

                let decoded = image::load_from_memory(&encoded.data).unwrap();
                assert_eq!(decoded.dimensions(), (800, 533));
            }
            other => panic!("expected re-encoded output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_calls_keep_their_own_output() {
        let preprocessor = ImagePreprocessor::new(PreprocessSettings {
            size_threshold_bytes: 1024,
            max_edge: 200,
            ..PreprocessSettings::default()
        });
        let other = preprocessor.clone();

        let landscape = upload(
            "landscape.png",
            "image/png",
            noisy_png(600, 300, ExtendedColorType::L8),
        );
        let portrait = upload(
            "portrait.png",
            "image/png",
            noisy_png(250, 500, ExtendedColorType::Rgb8),
        );

        let (first, second) = tokio::join!(
            preprocessor.preprocess(landscape),
            other.preprocess(portrait)
        );

        match (&first, &second) {
            (
                PreprocessOutcome::Reencoded {
                    file: a,
                    dimensions: da,
                    ..
                },
                PreprocessOutcome::Reencoded {
                    file: b,
                    dimensions: db,
                    ..
                },
            ) => {
                assert_eq!(a.name, "landscape.png");
                assert_eq!(da.as_tuple(), (200, 100));
                assert_eq!(b.name, "portrait.png");
                assert_eq!(db.as_tuple(), (100, 200));

                assert_eq!(image::load_from_memory(&a.data).unwrap().dimensions(), (200, 100));
                assert_eq!(image::load_from_memory(&b.data).unwrap().dimensions(), (100, 200));
            }
            other => panic!("expected two re-encoded outputs, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_large_file_within_cap_is_still_reencoded() {
        let data = noisy_png(800, 600, ExtendedColorType::Rgb8);
        assert!(data.len() > 1024 * 1024);
        let file = upload("already_small.png", "image/png", data);

        let preprocessor = ImagePreprocessor::new(PreprocessSettings::default());
        let outcome = preprocessor.preprocess(file).await;

        assert!(outcome.is_reencoded());
        let encoded = outcome.into_file();
        assert_eq!(encoded.content_type, "image/jpeg");
        let decoded = image::load_from_memory(&encoded.data).unwrap();
        assert_eq!(decoded.dimensions(), (800, 600));
    }

    #[tokio::test]
    async fn test_portrait_downscale_with_custom_cap() {
        let file = upload(
            "lateral.png",
            "image/png",
            noisy_png(300, 600, ExtendedColorType::L8),
        );
        let settings = PreprocessSettings {
            size_threshold_bytes: 1024,
            max_edge: 200,
            ..PreprocessSettings::default()
        };

        let outcome = ImagePreprocessor::new(settings).preprocess(file).await;
        match outcome {
            PreprocessOutcome::Reencoded { dimensions, .. } => {
                assert_eq!(dimensions.as_tuple(), (100, 200));
            }
            other => panic!("expected re-encoded output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_encoder_error_falls_back_to_original() {
        let file = upload("x.png", "image/png", noisy_png(64, 64, ExtendedColorType::Rgb8));
        let preprocessor =
            ImagePreprocessor::with_encoder(settings_with_threshold(1024), Arc::new(FailingEncoder));

        let outcome = preprocessor.preprocess(file.clone()).await;

        assert!(matches!(
            outcome.failure(),
            Some(ProcessingError::Encode(msg)) if msg == "encoder unavailable"
        ));
        assert_eq!(outcome.into_file(), file);
    }

    #[tokio::test]
    async fn test_empty_encoder_output_falls_back_to_original() {
        let file = upload("x.png", "image/png", noisy_png(64, 64, ExtendedColorType::Rgb8));
        let preprocessor =
            ImagePreprocessor::with_encoder(settings_with_threshold(1024), Arc::new(EmptyEncoder));

        let outcome = preprocessor.preprocess(file.clone()).await;

        assert_eq!(outcome.failure(), Some(&ProcessingError::EmptyOutput));
        assert_eq!(outcome.into_file(), file);
    }

    #[tokio::test]
    async fn test_panicking_encoder_falls_back_to_original() {
        let file = upload("x.png", "image/png", noisy_png(64, 64, ExtendedColorType::Rgb8));
        let preprocessor = ImagePreprocessor::with_encoder(
            settings_with_threshold(1024),
            Arc::new(PanickingEncoder),
        );

        let outcome = preprocessor.preprocess(file.clone()).await;

        assert!(matches!(outcome.failure(), Some(ProcessingError::TaskFailed(_))));
        assert_eq!(outcome.into_file(), file);
    }

    #[tokio::test]
    async fn test_undecodable_input_falls_back_to_original() {
        let file = upload("corrupt.jpg", "image/jpeg", Bytes::from(vec![0x42u8; 4096]));
        let preprocessor = ImagePreprocessor::new(settings_with_threshold(1024));

        let outcome = preprocessor.preprocess(file.clone()).await;

        assert!(matches!(outcome.failure(), Some(ProcessingError::Decode(_))));
        assert_eq!(outcome.into_file(), file);
    }

    #[tokio::test]
    async fn test_stalled_encode_times_out_to_original() {
        let file = upload("slow.png", "image/png", noisy_png(32, 32, ExtendedColorType::Rgb8));
        let settings = PreprocessSettings {
            size_threshold_bytes: 16,
            decode_timeout: Duration::from_millis(20),
            ..PreprocessSettings::default()
        };
        let preprocessor = ImagePreprocessor::with_encoder(
            settings,
            Arc::new(SlowEncoder(Duration::from_millis(300))),
        );

        let outcome = preprocessor.preprocess(file.clone()).await;

        assert_eq!(
            outcome.failure(),
            Some(&ProcessingError::Timeout(Duration::from_millis(20)))
        );
        assert_eq!(outcome.into_file(), file);
    }

    #[tokio::test]
    async fn test_dicom_payload_is_passed_through() {
        let mut data = vec![0u8; 4096];
        data[128..132].copy_from_slice(b"DICM");
        let file = upload("study.dcm", "application/dicom", Bytes::from(data));
        let preprocessor = ImagePreprocessor::new(settings_with_threshold(1024));

        let outcome = preprocessor.preprocess(file.clone()).await;

        assert!(matches!(
            outcome,
            PreprocessOutcome::Original {
                reason: PassThroughReason::NotRasterImage,
                ..
            }
        ));
        assert_eq!(outcome.into_file(), file);
    }

    #[test]
    fn test_is_dicom() {
        let mut data = vec![0u8; 132];
        assert!(!is_dicom(&data));
        data[128..132].copy_from_slice(b"DICM");
        assert!(is_dicom(&data));
        assert!(!is_dicom(b"DICM"));
    }
}
