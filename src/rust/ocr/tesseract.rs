use std::process::Command;

use image::{GrayImage, ImageFormat};
use log::{debug, error};

use super::{OcrEngine, OcrError};

/// Runs the `tesseract` binary on a temporary PNG and reads the text from
/// its stdout.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let file = tempfile::Builder::new()
            .prefix("jobcheck-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(file.path(), ImageFormat::Png)?;

        debug!("Running {} on {:?}", self.command, file.path());
        let output = Command::new(&self.command)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| OcrError::EngineFailed(format!("failed to start {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("{} exited with {}: {}", self.command, output.status, stderr.trim());
            return Err(OcrError::EngineFailed(format!("{} exited with {}", self.command, output.status)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}
