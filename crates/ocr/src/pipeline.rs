use std::path::Path;
use thiserror::Error;
use tokio::sync::watch;

use crate::extract::Extractor;
use crate::preprocess;
use crate::recognizer::{OcrError, Recognition, RecognitionAdapter};
use crate::types::Candidates;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Preprocessing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The result of a single photo processing run.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Raw OCR text output.
    pub ocr_text: String,
    /// Engine confidence, 0–100.
    pub confidence: f32,
    /// Reading candidates extracted from the OCR text.
    pub candidates: Candidates,
}

/// A scan whose recognition step is still running.
pub struct Scan {
    recognition: Recognition,
}

impl Scan {
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.recognition.progress()
    }

    /// Wait for the engine, then extract candidates from its text.
    pub async fn finish(self) -> Result<OcrResult, PipelineError> {
        let result = self.recognition.wait().await?;
        let candidates = Extractor::extract(&result.text);
        tracing::debug!(
            km_per_liter = ?candidates.km_per_liter.values,
            distance = ?candidates.distance.values,
            "Extracted reading candidates"
        );
        Ok(OcrResult {
            ocr_text: result.text,
            confidence: result.confidence,
            candidates,
        })
    }
}

/// Orchestrates: preprocess → OCR → extract.
#[derive(Clone)]
pub struct ReadingPipeline {
    recognizer: RecognitionAdapter,
}

impl ReadingPipeline {
    pub fn new(recognizer: RecognitionAdapter) -> Self {
        Self { recognizer }
    }

    /// Decode and normalize `data` on a blocking worker, then hand the
    /// bitmap to the engine.
    pub async fn begin(&self, data: impl Into<Vec<u8>>) -> Result<Scan, PipelineError> {
        let data = data.into();
        let bitmap = tokio::task::spawn_blocking(move || preprocess::preprocess(&data)).await??;
        tracing::debug!(width = bitmap.width(), height = bitmap.height(), "Image preprocessed");
        Ok(Scan { recognition: self.recognizer.recognize(bitmap) })
    }

    /// Process raw bytes (from camera capture or file read).
    pub async fn process_bytes(&self, data: &[u8]) -> Result<OcrResult, PipelineError> {
        self.begin(data).await?.finish().await
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<OcrResult, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.begin(bytes).await?.finish().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;
    use std::sync::Arc;

    fn tiny_png() -> Vec<u8> {
        png_of_size(4)
    }

    fn png_of_size(side: u32) -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(side, side, |x, y| Luma([((x ^ y) & 0xff) as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn pipeline(mock: MockRecognizer) -> ReadingPipeline {
        ReadingPipeline::new(RecognitionAdapter::new(Arc::new(mock), "eng"))
    }

    #[tokio::test]
    async fn process_bytes_produces_candidates() {
        let p = pipeline(
            MockRecognizer::new("AVG 14.5 km/L\nTRIP A 120.3 km").with_confidence(81.0),
        );

        let result = p.process_bytes(&tiny_png()).await.unwrap();

        assert_eq!(result.confidence, 81.0);
        assert_eq!(result.candidates.km_per_liter.values, vec![14.5]);
        assert_eq!(result.candidates.distance.values, vec![120.3]);
        assert_eq!(result.ocr_text, "AVG 14.5 km/L\nTRIP A 120.3 km");
    }

    #[tokio::test]
    async fn undecodable_bytes_fail_before_recognition() {
        let p = pipeline(MockRecognizer::new("12 km"));
        let err = p.process_bytes(b"not an image").await.unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn preprocessing_leaves_the_runtime_free() {
        let p = pipeline(MockRecognizer::new("Distance: 31 km"));
        let ticker = tokio::spawn(async {});

        let scan = p.begin(png_of_size(1500)).await.unwrap();

        // The decode ran on a blocking worker, so the single runtime thread
        // got to drive the ticker while `begin` was waiting on it.
        assert!(ticker.is_finished());
        let result = scan.finish().await.unwrap();
        assert_eq!(result.candidates.distance.values, vec![31.0]);
    }

    #[tokio::test]
    async fn engine_failure_propagates() {
        let p = pipeline(MockRecognizer::failing("no data"));
        let err = p.process_bytes(&tiny_png()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(OcrError::Engine(_))));
    }

    #[tokio::test]
    async fn process_file_reads_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let p = pipeline(MockRecognizer::new("Distance: 88 km"));
        let result = p.process_file(&path).await.unwrap();
        assert_eq!(result.candidates.distance.values, vec![88.0]);
    }

    #[tokio::test]
    async fn process_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(MockRecognizer::new(""));
        let err = p.process_file(&dir.path().join("nope.jpg")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
