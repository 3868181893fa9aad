use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::OcrConfig;
use crate::preprocess::Bitmap;
use crate::types::RecognitionResult;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image encode error: {0}")]
    ImageEncode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available, build with the `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR engine.
///
/// Implementations run synchronously on a blocking worker thread and may
/// report progress while they are recognizing text.
pub trait OcrBackend: Send + Sync + 'static {
    fn recognize(
        &self,
        bitmap: &Bitmap,
        language: &str,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError>;
}

/// Write side of a recognition progress stream (0–100, never decreasing).
pub struct ProgressReporter {
    tx: watch::Sender<u8>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, watch::Receiver<u8>) {
        let (tx, rx) = watch::channel(0);
        (Self { tx }, rx)
    }

    /// Values above 100 are capped; values below the last report are ignored.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        self.tx.send_if_modified(|current| {
            if percent > *current {
                *current = percent;
                true
            } else {
                false
            }
        });
    }
}

/// An in-flight recognition: resolves to the result and exposes progress.
pub struct Recognition {
    progress: watch::Receiver<u8>,
    task: JoinHandle<Result<RecognitionResult, OcrError>>,
}

impl Recognition {
    /// Intermediate percentages. Updates may be coalesced; the stream closes
    /// when the engine returns.
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.clone()
    }

    pub async fn wait(self) -> Result<RecognitionResult, OcrError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(OcrError::Engine(format!("recognition task failed: {e}"))),
        }
    }
}

/// Runs one [`OcrBackend`] invocation per call, off the async runtime.
#[derive(Clone)]
pub struct RecognitionAdapter {
    backend: Arc<dyn OcrBackend>,
    language: String,
}

impl RecognitionAdapter {
    pub fn new(backend: Arc<dyn OcrBackend>, language: impl Into<String>) -> Self {
        Self { backend, language: language.into() }
    }

    pub fn from_config(backend: Arc<dyn OcrBackend>, config: &OcrConfig) -> Self {
        Self::new(backend, config.language.clone())
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Start recognizing `bitmap`. Must be called within a Tokio runtime.
    /// The bitmap is dropped as soon as the engine returns, success or not.
    pub fn recognize(&self, bitmap: Bitmap) -> Recognition {
        let (reporter, progress) = ProgressReporter::channel();
        let backend = Arc::clone(&self.backend);
        let language = self.language.clone();

        let task = tokio::task::spawn_blocking(move || {
            let result = backend.recognize(&bitmap, &language, &reporter);
            drop(bitmap);
            result.map(|r| RecognitionResult::new(r.text, r.confidence))
        });

        Recognition { progress, task }
    }
}

/// Build the engine described by `config`.
pub fn backend_from_config(config: &OcrConfig) -> Result<Arc<dyn OcrBackend>, OcrError> {
    #[cfg(feature = "tesseract")]
    {
        Ok(Arc::new(tesseract_backend::TesseractRecognizer::from_config(config)))
    }
    #[cfg(not(feature = "tesseract"))]
    {
        let _ = config;
        Err(OcrError::NotAvailable)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a preset result, useful for driving the extraction and review
/// steps without requiring Tesseract to be installed.
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    pub text: String,
    pub confidence: f32,
    /// Percentages reported, in order, before returning.
    pub progress_steps: Vec<u8>,
    /// When set, every call fails with this engine error.
    pub failure: Option<String>,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: 90.0,
            progress_steps: Vec::new(),
            failure: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { failure: Some(message.into()), ..Self::new("") }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_progress(mut self, steps: &[u8]) -> Self {
        self.progress_steps = steps.to_vec();
        self
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(
        &self,
        _bitmap: &Bitmap,
        _language: &str,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, OcrError> {
        for step in &self.progress_steps {
            progress.report(*step);
        }
        match &self.failure {
            Some(message) => Err(OcrError::Engine(message.clone())),
            None => Ok(RecognitionResult::new(self.text.clone(), self.confidence)),
        }
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, ProgressReporter};
    use crate::config::OcrConfig;
    use crate::preprocess::Bitmap;
    use crate::types::RecognitionResult;
    use leptess::LepTess;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }

        pub fn from_config(config: &OcrConfig) -> Self {
            Self::new(
                config
                    .tessdata_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(
            &self,
            bitmap: &Bitmap,
            language: &str,
            progress: &ProgressReporter,
        ) -> Result<RecognitionResult, OcrError> {
            let png = bitmap
                .to_png()
                .map_err(|e| OcrError::ImageEncode(e.to_string()))?;
            let mut lt = LepTess::new(self.data_path.as_deref(), language)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::Engine(e.to_string()))?;

            // leptess exposes no progress monitor; bracket the recognize call.
            progress.report(0);
            let text = lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))?;
            let confidence = lt.mean_text_conf() as f32;
            progress.report(100);

            Ok(RecognitionResult::new(text, confidence))
        }
    }
}
