mod common;

use std::io::Cursor;
use std::sync::Arc;

use image::{GrayImage, ImageFormat, Luma};
use jobcheck::{
    ClassificationService, InputSource, Label, OcrError, OcrEngine, PredictionResult, RawInput, TextNormalizer,
};
use tokio_util::sync::CancellationToken;

use common::{fake_posting, init_logger, real_posting, records};

#[derive(Debug)]
struct FixedTextEngine(String);

impl OcrEngine for FixedTextEngine {
    fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn trained_service() -> Result<ClassificationService, Box<dyn std::error::Error>> {
    init_logger();
    let service = ClassificationService::builder()
        .with_ocr_engine(Arc::new(FixedTextEngine(fake_posting(500))))
        .build()?;
    service.retrain(&records(60, 20), &CancellationToken::new())?;
    Ok(service)
}

fn png() -> Vec<u8> {
    let image = GrayImage::from_pixel(16, 16, Luma([200]));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

#[test]
fn test_end_to_end_classification() -> Result<(), Box<dyn std::error::Error>> {
    let service = trained_service()?;

    let real = service.classify_text(&real_posting(1000))?;
    assert_eq!(real.label, Label::Real);
    let fake = service.classify_text(&fake_posting(1000))?;
    assert_eq!(fake.label, Label::Fake);

    for result in [real, fake] {
        assert!(result.confidence >= 50.0 && result.confidence <= 100.0);
    }
    Ok(())
}

#[test]
fn test_short_input_is_invalid() -> Result<(), Box<dyn std::error::Error>> {
    let service = trained_service()?;

    assert_eq!(service.classify_text("short")?, PredictionResult::invalid());
    // nine content words after normalization
    let nine = "engineer developer analyst manager office team project salary benefit of the";
    assert_eq!(service.classify_text(nine)?.label, Label::Invalid);
    assert_eq!(service.classify_text("")?.confidence, 0.0);
    Ok(())
}

#[test]
fn test_label_follows_probability() -> Result<(), Box<dyn std::error::Error>> {
    let service = trained_service()?;
    let pair = service.store().get_active()?;
    let normalizer = TextNormalizer::new();

    for text in [real_posting(7), fake_posting(7), format!("{} {}", real_posting(3), fake_posting(4))] {
        let probability = pair.predict_proba(&normalizer.normalize(&text))?;
        let result = service.classify_text(&text)?;
        assert_eq!(result.label == Label::Fake, probability >= 0.5);
        assert!((0.0..=100.0).contains(&result.confidence));
    }
    Ok(())
}

#[test]
fn test_classification_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
    let service = trained_service()?;
    let text = format!("{} {}", real_posting(11), fake_posting(12));
    assert_eq!(service.classify_text(&text)?, service.classify_text(&text)?);
    Ok(())
}

#[test]
fn test_image_submission_takes_precedence() -> Result<(), Box<dyn std::error::Error>> {
    let service = trained_service()?;

    let input = RawInput::from_submission(Some(real_posting(1)), Some(png()));
    let report = service.classify_detailed(&input)?;
    assert_eq!(report.source, InputSource::Ocr);
    assert_eq!(report.result.label, Label::Fake);
    assert_eq!(report.model_version, service.store().active_version());

    let input = RawInput::from_submission(Some(real_posting(1)), Some(Vec::new()));
    let report = service.classify_detailed(&input)?;
    assert_eq!(report.source, InputSource::Text);
    assert_eq!(report.result.label, Label::Real);
    Ok(())
}

#[test]
fn test_prediction_serializes_as_label_and_confidence() -> Result<(), Box<dyn std::error::Error>> {
    let service = trained_service()?;
    let result = service.classify_text(&fake_posting(2))?;
    let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&result)?)?;

    assert_eq!(json["label"], "Fake");
    assert!(json["confidence"].is_f64());
    assert!(result.is_flagged(50.0));
    assert!(!result.is_flagged(100.1));
    Ok(())
}

#[test]
fn test_normalization_scenarios() {
    let normalizer = TextNormalizer::new();

    let text = normalizer.normalize("Great Job!! Visit http://x.com NOW");
    assert_eq!(text.tokens().collect::<Vec<_>>(), vec!["great", "job", "visit", "now"]);

    for raw in [
        "Great Job!! Visit http://x.com NOW",
        "<p>Apply TODAY at www.jobs.example, 100% remote!</p>",
        "Our companies' analyses: classes, boxes, matches & wishes",
        "",
    ] {
        let once = normalizer.normalize(raw);
        assert_eq!(normalizer.normalize(once.as_str()), once, "not idempotent for {:?}", raw);
    }
}
