use ambagas_core::{LedgerError, TripId, TripLedger, TripTarget};
use thiserror::Error;
use tokio::sync::watch;

use crate::pipeline::{OcrResult, PipelineError, ReadingPipeline, Scan};
use crate::session::{Notice, OcrSession, Phase, RangeAdvisory};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("No photo import is awaiting review")]
    NotReady,
    #[error("Both values must be greater than 0")]
    InvalidInput,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The session reached `Ready`, with candidates or with an advisory.
    Completed,
    /// Another import was still running; this request was dropped.
    Ignored,
}

/// What a successful apply wrote into the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub trip_id: TripId,
    pub target: TripTarget,
    pub km_per_liter: f64,
    pub distance_km: f64,
}

/// Drives photo → candidates → human review → ledger for one session at a time.
///
/// The current [`OcrSession`] lives in a watch channel: every transition
/// replaces it with a new value, and UIs follow along via [`subscribe`].
///
/// [`subscribe`]: ReviewWorkflow::subscribe
pub struct ReviewWorkflow {
    pipeline: ReadingPipeline,
    session: watch::Sender<OcrSession>,
}

impl ReviewWorkflow {
    pub fn new(pipeline: ReadingPipeline) -> Self {
        let (session, _) = watch::channel(OcrSession::idle());
        Self { pipeline, session }
    }

    pub fn snapshot(&self) -> OcrSession {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OcrSession> {
        self.session.subscribe()
    }

    /// Run preprocessing and recognition for `image_bytes` and stop in
    /// `Ready`. Failures are downgraded to an empty `Ready` session so the
    /// user can always type the values. Ignored while another import runs.
    pub async fn import(&self, target: TripTarget, image_bytes: &[u8]) -> ImportOutcome {
        let started = self.session.send_if_modified(|s| {
            if s.is_running() {
                return false;
            }
            if s.is_ready() {
                tracing::debug!("Discarding unreviewed session for a new import");
            }
            *s = OcrSession::running(target);
            true
        });
        if !started {
            tracing::debug!(%target, "Import ignored, another import is running");
            return ImportOutcome::Ignored;
        }

        tracing::info!(%target, bytes = image_bytes.len(), "Starting photo import");
        let guard = RunningGuard { session: &self.session, armed: true };

        let outcome = match self.pipeline.begin(image_bytes).await {
            Ok(scan) => self.follow(scan).await,
            Err(e) => Err(e),
        };
        guard.disarm();

        match outcome {
            Ok(result) => {
                tracing::info!(
                    confidence = result.confidence,
                    km_per_liter = result.candidates.km_per_liter.values.len(),
                    distance = result.candidates.distance.values.len(),
                    "Photo import ready for review"
                );
                self.transition(|s| s.recognized(result.confidence, result.candidates));
            }
            Err(e) => {
                tracing::warn!("Photo import failed, manual input required: {e}");
                self.transition(OcrSession::failed);
            }
        }
        ImportOutcome::Completed
    }

    /// Await the scan while mirroring engine progress into the session.
    async fn follow(&self, scan: Scan) -> Result<OcrResult, PipelineError> {
        let mut progress = scan.progress();
        let finished = scan.finish();
        tokio::pin!(finished);

        loop {
            tokio::select! {
                result = &mut finished => return result,
                changed = progress.changed() => {
                    if changed.is_err() {
                        return (&mut finished).await;
                    }
                    let percent = *progress.borrow_and_update();
                    tracing::debug!(percent, "Recognition progress");
                    self.transition(|s| s.with_progress(percent));
                }
            }
        }
    }

    pub fn set_chosen_km_per_liter(&self, value: impl Into<String>) -> Result<(), ReviewError> {
        let value = value.into();
        self.transition_if_ready(|s| s.with_chosen_km_per_liter(value))
    }

    pub fn set_chosen_distance_km(&self, value: impl Into<String>) -> Result<(), ReviewError> {
        let value = value.into();
        self.transition_if_ready(|s| s.with_chosen_distance_km(value))
    }

    /// Out-of-range warning for the currently chosen values. Never blocks apply.
    pub fn range_advisory(&self) -> Option<RangeAdvisory> {
        self.session.borrow().range_advisory()
    }

    /// Write the chosen values into the target trip and end the session.
    ///
    /// Both values must be strictly positive; otherwise the session stays in
    /// `Ready` with a rejection message.
    pub fn apply<L: TripLedger + ?Sized>(&self, ledger: &mut L) -> Result<Applied, ReviewError> {
        let session = self.snapshot();
        let (Phase::Ready, Some(target), Some(extraction)) =
            (session.phase, session.target, session.extracted.as_ref())
        else {
            return Err(ReviewError::NotReady);
        };
        // Only touch the session this call read; an import may have replaced it.
        let still_reviewing = |s: &OcrSession| s.is_ready() && s.target == Some(target);

        let Some((km_per_liter, distance_km)) = extraction.chosen_values() else {
            self.transition_when(still_reviewing, |s| {
                s.with_message(Notice::InvalidApplyInput.to_string())
            });
            return Err(ReviewError::InvalidInput);
        };

        if let Some(advisory) = extraction.range_advisory() {
            tracing::info!(?advisory, km_per_liter, distance_km, "Applying out-of-range values");
        }

        match ledger.apply_values(&target, km_per_liter, distance_km) {
            Ok(trip_id) => {
                tracing::info!(%trip_id, km_per_liter, distance_km, "Photo import applied");
                if !self.transition_when(still_reviewing, |_| OcrSession::idle()) {
                    tracing::debug!("Session replaced during apply, leaving it in place");
                }
                Ok(Applied { trip_id, target, km_per_liter, distance_km })
            }
            Err(e) => {
                tracing::warn!("Ledger rejected photo import: {e}");
                let message = e.to_string();
                self.transition_when(still_reviewing, |s| s.with_message(message));
                Err(e.into())
            }
        }
    }

    /// Discard a session awaiting review. A running import cannot be
    /// cancelled; returns whether anything was discarded.
    pub fn cancel(&self) -> bool {
        let cancelled = self.session.send_if_modified(|s| {
            if !s.is_ready() {
                return false;
            }
            *s = OcrSession::idle();
            true
        });
        if cancelled {
            tracing::info!("Photo import cancelled");
        }
        cancelled
    }

    fn transition(&self, f: impl FnOnce(OcrSession) -> OcrSession) {
        self.session.send_modify(|s| *s = f(std::mem::take(s)));
    }

    /// Check-and-set: apply `f` only if `guard` holds for the current value.
    fn transition_when(
        &self,
        guard: impl FnOnce(&OcrSession) -> bool,
        f: impl FnOnce(OcrSession) -> OcrSession,
    ) -> bool {
        self.session.send_if_modified(|s| {
            if !guard(s) {
                return false;
            }
            *s = f(std::mem::take(s));
            true
        })
    }

    fn transition_if_ready(
        &self,
        f: impl FnOnce(OcrSession) -> OcrSession,
    ) -> Result<(), ReviewError> {
        if self.transition_when(OcrSession::is_ready, f) {
            Ok(())
        } else {
            Err(ReviewError::NotReady)
        }
    }
}

/// Resets a session left in `Running` when the import future is dropped.
struct RunningGuard<'a> {
    session: &'a watch::Sender<OcrSession>,
    armed: bool,
}

impl RunningGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.send_if_modified(|s| {
                if !s.is_running() {
                    return false;
                }
                *s = OcrSession::idle();
                true
            });
        }
    }
}
