pub mod config;
pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod review;
pub mod session;
pub mod types;

pub use config::{ConfigError, OcrConfig};
pub use extract::Extractor;
pub use pipeline::{OcrResult, PipelineError, ReadingPipeline, Scan};
pub use preprocess::{preprocess, preprocess_file, Bitmap, PreprocessError};
pub use recognizer::{
    backend_from_config, MockRecognizer, OcrBackend, OcrError, ProgressReporter, Recognition,
    RecognitionAdapter,
};
pub use review::{Applied, ImportOutcome, ReviewError, ReviewWorkflow};
pub use session::{Extraction, Notice, OcrSession, Phase, RangeAdvisory};
pub use types::{CandidateSet, Candidates, RecognitionResult};
