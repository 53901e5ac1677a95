//! Image-to-text front end.
//!
//! Images are decoded, reduced to grayscale, binarized at a fixed threshold
//! and handed to an [`OcrEngine`]. Whatever comes back goes through the same
//! [`TextNormalizer`] as typed text. Every failure along the way is logged
//! and turned into empty text, which the classifier reports as invalid input.

mod preprocess;
mod tesseract;

use std::fmt;
use std::io;
use std::sync::Arc;

use image::GrayImage;
use log::{debug, warn};

use crate::config::OcrConfig;
use crate::text::{NormalizedText, TextNormalizer};

pub use preprocess::binarize;
pub use tesseract::TesseractEngine;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Image of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("Image is empty")]
    Empty,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("OCR engine failed: {0}")]
    EngineFailed(String),
}

/// Optical character recognition over a preprocessed single-channel image.
pub trait OcrEngine: Send + Sync + fmt::Debug {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;

    fn name(&self) -> &'static str;
}

/// Turns an encoded raster image into normalized text.
#[derive(Debug, Clone)]
pub struct ImageTextExtractor {
    engine: Arc<dyn OcrEngine>,
    normalizer: TextNormalizer,
    config: OcrConfig,
}

impl ImageTextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, config: OcrConfig) -> Self {
        Self {
            engine,
            normalizer: TextNormalizer::new(),
            config,
        }
    }

    /// Extractor backed by the `tesseract` command line tool.
    pub fn with_tesseract(config: OcrConfig) -> Self {
        let engine = TesseractEngine::new(&config.tesseract_command, &config.language);
        Self::new(Arc::new(engine), config)
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Never fails: unreadable images and empty OCR output both yield empty
    /// text.
    pub fn extract(&self, bytes: &[u8]) -> NormalizedText {
        match self.extract_raw(bytes) {
            Ok(raw) => {
                let text = self.normalizer.normalize(&raw);
                if text.is_empty() {
                    warn!("OCR produced no usable text ({} raw chars)", raw.len());
                }
                text
            }
            Err(e) => {
                warn!("Treating unreadable image as empty text: {}", e);
                NormalizedText::default()
            }
        }
    }

    /// Decodes, binarizes and recognizes, returning the engine's raw text.
    pub fn extract_raw(&self, bytes: &[u8]) -> Result<String, OcrError> {
        if bytes.is_empty() {
            return Err(OcrError::Empty);
        }
        if bytes.len() > self.config.max_image_bytes {
            return Err(OcrError::TooLarge {
                size: bytes.len(),
                limit: self.config.max_image_bytes,
            });
        }

        let decoded = image::load_from_memory(bytes)?;
        debug!("Decoded {}x{} image for OCR", decoded.width(), decoded.height());
        let binary = binarize(&decoded, self.config.binarize_threshold);
        self.engine.recognize(&binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Returns canned text and remembers the pixels it was shown.
    #[derive(Debug, Default)]
    struct CannedEngine {
        text: String,
        seen: Mutex<Vec<u8>>,
    }

    impl OcrEngine for CannedEngine {
        fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
            *self.seen.lock().unwrap() = image.as_raw().clone();
            Ok(self.text.clone())
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    fn png_bytes() -> Vec<u8> {
        let image = RgbImage::from_fn(8, 8, |x, _| if x < 4 { Rgb([20, 20, 20]) } else { Rgb([220, 220, 220]) });
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn extractor(engine: Arc<CannedEngine>) -> ImageTextExtractor {
        ImageTextExtractor::new(engine, OcrConfig::default())
    }

    #[test]
    fn test_ocr_text_is_normalized() {
        let engine = Arc::new(CannedEngine {
            text: "URGENT!! Earn $$$ from home: www.pay.me".into(),
            ..Default::default()
        });
        let text = extractor(Arc::clone(&engine)).extract(&png_bytes());
        assert_eq!(text.as_str(), "urgent earn home");
    }

    #[test]
    fn test_engine_sees_binarized_image() {
        let engine = Arc::new(CannedEngine::default());
        extractor(Arc::clone(&engine)).extract(&png_bytes());
        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 64);
        assert!(seen.iter().all(|&p| p == 0 || p == 255));
        assert!(seen.contains(&0) && seen.contains(&255));
    }

    #[test]
    fn test_corrupt_image_yields_empty_text() {
        let engine = Arc::new(CannedEngine {
            text: "should not be used".into(),
            ..Default::default()
        });
        let extractor = extractor(engine);
        assert!(extractor.extract(b"definitely not an image").is_empty());
        assert!(extractor.extract(&[]).is_empty());
        assert!(matches!(extractor.extract_raw(&[]), Err(OcrError::Empty)));
    }

    #[test]
    fn test_oversized_image_rejected() {
        let engine = Arc::new(CannedEngine::default());
        let config = OcrConfig {
            max_image_bytes: 16,
            ..OcrConfig::default()
        };
        let extractor = ImageTextExtractor::new(engine, config);
        assert!(matches!(
            extractor.extract_raw(&png_bytes()),
            Err(OcrError::TooLarge { limit: 16, .. })
        ));
        assert!(extractor.extract(&png_bytes()).is_empty());
    }
}
