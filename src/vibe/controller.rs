use super::lifecycle::{LifecycleState, MAX_PROGRESS, advance_progress, step_for_progress};
use crate::client::VibeGateway;
use crate::config::TickerConfig;
use crate::error::VibeError;
use crate::models::AnalysisResult;
use crate::session::{Credential, Session};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Failure message committed when the gateway panics mid-call
pub const ANALYSIS_CRASHED_MESSAGE: &str = "Analysis failed unexpectedly";

/// State shared between the controller, its ticker threads and its workers
struct Shared {
    state: LifecycleState,
    /// Id of the most recent `start_analysis`; anything older is stale
    latest_call: u64,
    analyzing: Option<String>,
    listeners: Vec<Sender<LifecycleState>>,
}

impl Shared {
    fn set_state(&mut self, state: LifecycleState) {
        self.state = state;
        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = self.state.clone();
        self.listeners
            .retain(|listener| listener.send(snapshot.clone()).is_ok());
    }
}

/// Lock the shared state, recovering from poisoning.
///
/// A panic in a worker leaves the state machine in a consistent enum value,
/// so the inner data is still usable.
fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("[Controller] State mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Runs one playlist analysis at a time and exposes where it stands.
///
/// Starting a new analysis while one is in flight supersedes it: the older
/// call keeps running, but its ticks and its result are dropped once they
/// no longer carry the latest call id.
pub struct AnalysisController<G> {
    gateway: Arc<G>,
    session: Session,
    ticker: TickerConfig,
    shared: Arc<Mutex<Shared>>,
}

/// Handle on one started analysis
pub struct AnalysisHandle {
    call_id: u64,
    worker: JoinHandle<()>,
}

impl AnalysisHandle {
    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Block until this call's worker is done, whether or not its result was kept
    pub fn wait(self) {
        if self.worker.join().is_err() {
            log::error!("[Controller] Analysis worker {} panicked", self.call_id);
        }
    }
}

impl<G> AnalysisController<G>
where
    G: VibeGateway + Send + Sync + 'static,
{
    pub fn new(gateway: Arc<G>, session: Session, ticker: TickerConfig) -> Self {
        AnalysisController {
            gateway,
            session,
            ticker,
            shared: Arc::new(Mutex::new(Shared {
                state: LifecycleState::Idle,
                latest_call: 0,
                analyzing: None,
                listeners: Vec::new(),
            })),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> LifecycleState {
        lock_shared(&self.shared).state.clone()
    }

    pub fn analyzing_playlist_id(&self) -> Option<String> {
        lock_shared(&self.shared).analyzing.clone()
    }

    /// Receive every state transition from now on, in order
    pub fn subscribe(&self) -> Receiver<LifecycleState> {
        let (tx, rx) = mpsc::channel();
        lock_shared(&self.shared).listeners.push(tx);
        rx
    }

    /// Kick off an analysis of `playlist_id`.
    ///
    /// Fails straight away with an auth error, leaving the state untouched,
    /// when the session holds no credential.
    pub fn start_analysis(&self, playlist_id: &str) -> Result<AnalysisHandle, VibeError> {
        let credential = self
            .session
            .credential()
            .ok_or_else(VibeError::missing_credential)?;

        let call_id = {
            let mut shared = lock_shared(&self.shared);
            if let Some(previous) = &shared.analyzing {
                log::info!(
                    "[Controller] Superseding in-flight analysis of {} with {}",
                    previous,
                    playlist_id
                );
            }
            shared.latest_call += 1;
            shared.analyzing = Some(playlist_id.to_string());
            shared.set_state(LifecycleState::requesting(playlist_id));
            shared.latest_call
        };
        log::info!("[Controller] Analysis {} started for {}", call_id, playlist_id);

        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let ticker = spawn_ticker(Arc::clone(&self.shared), call_id, self.ticker, cancel_rx);

        let gateway = Arc::clone(&self.gateway);
        let shared = Arc::clone(&self.shared);
        let playlist_id = playlist_id.to_string();
        let worker = thread::spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run_analysis(gateway.as_ref(), &credential, &playlist_id)
            }))
            .unwrap_or_else(|_| {
                log::error!("[Controller] Analysis {} panicked in the gateway", call_id);
                Err(VibeError::MalformedResponse(
                    ANALYSIS_CRASHED_MESSAGE.to_string(),
                ))
            });

            // Stop and join the ticker before committing so no tick lands after the result
            drop(cancel_tx);
            if ticker.join().is_err() {
                log::error!("[Controller] Ticker for analysis {} panicked", call_id);
            }

            commit(&shared, call_id, outcome);
        });

        Ok(AnalysisHandle { call_id, worker })
    }

    /// Dismiss a finished report or error. Does nothing while a request is running.
    pub fn clear_result(&self) {
        let mut shared = lock_shared(&self.shared);
        if shared.state.is_terminal() {
            shared.set_state(LifecycleState::Idle);
        }
    }
}

/// Liveness probe first, then the real request
fn run_analysis<G>(
    gateway: &G,
    credential: &Credential,
    playlist_id: &str,
) -> Result<AnalysisResult, VibeError>
where
    G: VibeGateway + ?Sized,
{
    if !gateway.probe_backend() {
        return Err(VibeError::BackendUnavailable);
    }
    gateway.request_analysis(credential, playlist_id)
}

fn spawn_ticker(
    shared: Arc<Mutex<Shared>>,
    call_id: u64,
    config: TickerConfig,
    cancel: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match cancel.recv_timeout(config.interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if !tick(&shared, call_id, config.step) {
                        break;
                    }
                }
                // Sender dropped or signalled: the call resolved
                _ => break,
            }
        }
    })
}

/// Advance the progress bar once. Returns whether the ticker should keep going.
fn tick(shared: &Mutex<Shared>, call_id: u64, step: u8) -> bool {
    let mut shared = lock_shared(shared);
    if shared.latest_call != call_id {
        return false;
    }

    let progress = match &mut shared.state {
        LifecycleState::Requesting {
            progress,
            step: step_index,
            ..
        } => {
            *progress = advance_progress(*progress, step);
            *step_index = step_for_progress(*progress);
            *progress
        }
        _ => return false,
    };
    shared.publish();

    progress < MAX_PROGRESS
}

fn commit(shared: &Mutex<Shared>, call_id: u64, outcome: Result<AnalysisResult, VibeError>) {
    let mut shared = lock_shared(shared);
    if shared.latest_call != call_id {
        log::debug!("[Controller] Discarding result of superseded analysis {}", call_id);
        return;
    }

    shared.analyzing = None;
    match outcome {
        Ok(result) => {
            if let LifecycleState::Requesting { progress, step, .. } = &mut shared.state {
                *progress = MAX_PROGRESS;
                *step = step_for_progress(MAX_PROGRESS);
            }
            shared.publish();

            log::info!(
                "[Controller] Analysis {} complete: {} ({} tracks)",
                call_id,
                result.playlist_name,
                result.quantitative.track_count
            );
            shared.set_state(LifecycleState::Succeeded { result });
        }
        Err(e) => {
            log::error!("[Controller] Analysis {} failed: {}", call_id, e);
            shared.set_state(LifecycleState::Failed {
                message: e.user_message(),
            });
        }
    }
}
