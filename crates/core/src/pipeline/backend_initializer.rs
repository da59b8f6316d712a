use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::detection::domain::backend::{Backend, BackendError, BackendKind, BackendLoader};

/// Lifecycle of backend construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AnalyzerState {
    Uninitialized,
    Initializing,
    /// At least one backend above the classical fallback loaded.
    Ready,
    /// Only the classical fallback loaded.
    Degraded,
    /// Nothing loaded.
    Failed,
}

impl AnalyzerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Degraded,
            _ => Self::Failed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initializing => 1,
            Self::Ready => 2,
            Self::Degraded => 3,
            Self::Failed => 4,
        }
    }

    /// State reached once every loader has run.
    fn settled(loaded: &[BackendKind]) -> Self {
        if loaded.iter().any(|k| *k != BackendKind::Classical) {
            Self::Ready
        } else if loaded.contains(&BackendKind::Classical) {
            Self::Degraded
        } else {
            Self::Failed
        }
    }

    pub fn is_usable(self) -> bool {
        matches!(self, Self::Ready | Self::Degraded)
    }
}

impl fmt::Display for AnalyzerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct Shared {
    state: AtomicU8,
    /// Loaded backends in priority order. Also the single analysis slot.
    backends: Mutex<Vec<Box<dyn Backend>>>,
    settled: Condvar,
    failures: Mutex<Vec<BackendError>>,
}

/// Builds backends on one background thread and publishes each as soon as
/// it is loaded, so analysis can run on a partial set.
pub struct BackendInitializer {
    shared: Arc<Shared>,
    loaders: Mutex<Option<Vec<Box<dyn BackendLoader>>>>,
}

impl BackendInitializer {
    pub fn new(loaders: Vec<Box<dyn BackendLoader>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(AnalyzerState::Uninitialized.as_u8()),
                backends: Mutex::new(Vec::new()),
                settled: Condvar::new(),
                failures: Mutex::new(Vec::new()),
            }),
            loaders: Mutex::new(Some(loaders)),
        }
    }

    /// Starts loading in the background and returns immediately.
    ///
    /// Only the first call has an effect.
    pub fn start(&self) {
        let claimed = self
            .shared
            .state
            .compare_exchange(
                AnalyzerState::Uninitialized.as_u8(),
                AnalyzerState::Initializing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !claimed {
            return;
        }

        let loaders = lock(&self.loaders).take().unwrap_or_default();
        let shared = self.shared.clone();
        thread::spawn(move || run_loaders(&shared, loaders));
    }

    pub fn state(&self) -> AnalyzerState {
        AnalyzerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_usable()
    }

    /// Blocks while initialization is in progress, up to `timeout`.
    ///
    /// Returns the state reached, which is still `Initializing` on timeout
    /// and `Uninitialized` if [`start`](Self::start) was never called.
    pub fn wait_until_ready(&self, timeout: Duration) -> AnalyzerState {
        let deadline = Instant::now() + timeout;
        let mut guard = lock(&self.shared.backends);
        loop {
            let state = self.state();
            if state != AnalyzerState::Initializing {
                return state;
            }
            let now = Instant::now();
            if now >= deadline {
                return state;
            }
            guard = self
                .shared
                .settled
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Kinds of the backends loaded so far, in priority order.
    pub fn available(&self) -> Vec<BackendKind> {
        lock(&self.shared.backends).iter().map(|b| b.kind()).collect()
    }

    /// Load failures recorded so far.
    pub fn failures(&self) -> Vec<BackendError> {
        lock(&self.shared.failures).clone()
    }

    /// Exclusive access to the loaded backends.
    ///
    /// Holding the guard serializes analysis calls; loaders publish new
    /// backends only between calls.
    pub fn backends(&self) -> MutexGuard<'_, Vec<Box<dyn Backend>>> {
        lock(&self.shared.backends)
    }
}

fn run_loaders(shared: &Shared, loaders: Vec<Box<dyn BackendLoader>>) {
    for loader in loaders {
        let kind = loader.kind();
        let started = Instant::now();
        match loader.load() {
            Ok(backend) => {
                log::info!("Loaded {kind} backend in {:.2?}", started.elapsed());
                let mut backends = lock(&shared.backends);
                backends.push(backend);
                backends.sort_by_key(|b| b.kind());
            }
            Err(e) => {
                log::warn!("{e}");
                lock(&shared.failures).push(e);
            }
        }
    }

    let backends = lock(&shared.backends);
    let loaded: Vec<BackendKind> = backends.iter().map(|b| b.kind()).collect();
    let state = AnalyzerState::settled(&loaded);
    shared.state.store(state.as_u8(), Ordering::Release);
    drop(backends);
    shared.settled.notify_all();

    match state {
        AnalyzerState::Failed => log::error!("No detection backend could be loaded"),
        _ => log::info!("Initialization finished: {state} ({loaded:?})"),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::backend::LocatedFace;
    use crate::shared::frame::Frame;
    use rstest::rstest;
    use std::sync::atomic::AtomicUsize;

    struct NullBackend(BackendKind);

    impl Backend for NullBackend {
        fn kind(&self) -> BackendKind {
            self.0
        }

        fn locate_faces(&mut self, _frame: &Frame) -> Result<Vec<LocatedFace>, BackendError> {
            Ok(Vec::new())
        }
    }

    struct StubLoader {
        kind: BackendKind,
        succeeds: bool,
        calls: Arc<AtomicUsize>,
        gate: Option<Mutex<crossbeam_channel::Receiver<()>>>,
    }

    impl StubLoader {
        fn boxed(kind: BackendKind, succeeds: bool) -> Box<dyn BackendLoader> {
            Box::new(Self {
                kind,
                succeeds,
                calls: Arc::new(AtomicUsize::new(0)),
                gate: None,
            })
        }
    }

    impl BackendLoader for StubLoader {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn load(&self) -> Result<Box<dyn Backend>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _ = lock(gate).recv();
            }
            if self.succeeds {
                Ok(Box::new(NullBackend(self.kind)))
            } else {
                Err(BackendError::unavailable(self.kind, "stub"))
            }
        }
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_starts_uninitialized() {
        let init = BackendInitializer::new(vec![StubLoader::boxed(BackendKind::Classical, true)]);
        assert_eq!(init.state(), AnalyzerState::Uninitialized);
        assert!(!init.is_ready());
        assert_eq!(
            init.wait_until_ready(Duration::from_millis(10)),
            AnalyzerState::Uninitialized
        );
    }

    #[rstest]
    #[case::all(&[true, true, true], AnalyzerState::Ready)]
    #[case::unified_only(&[false, true, false], AnalyzerState::Ready)]
    #[case::classical_only(&[false, false, true], AnalyzerState::Degraded)]
    #[case::nothing(&[false, false, false], AnalyzerState::Failed)]
    fn test_settled_state(#[case] succeeds: &[bool], #[case] expected: AnalyzerState) {
        let loaders = BackendKind::PRIORITY
            .iter()
            .zip(succeeds)
            .map(|(&kind, &ok)| StubLoader::boxed(kind, ok))
            .collect();
        let init = BackendInitializer::new(loaders);
        init.start();

        assert_eq!(init.wait_until_ready(WAIT), expected);
        assert_eq!(init.is_ready(), expected.is_usable());
        assert_eq!(init.failures().len(), succeeds.iter().filter(|ok| !**ok).count());
    }

    #[test]
    fn test_start_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = StubLoader {
            kind: BackendKind::Unified,
            succeeds: true,
            calls: calls.clone(),
            gate: None,
        };
        let init = BackendInitializer::new(vec![Box::new(loader)]);
        init.start();
        init.start();
        init.wait_until_ready(WAIT);
        init.start();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(init.available(), vec![BackendKind::Unified]);
    }

    #[test]
    fn test_partial_readiness_exposes_loaded_backends() {
        let (release, gate) = crossbeam_channel::bounded(1);
        let slow = StubLoader {
            kind: BackendKind::Unified,
            succeeds: true,
            calls: Arc::new(AtomicUsize::new(0)),
            gate: Some(Mutex::new(gate)),
        };
        let init = BackendInitializer::new(vec![
            StubLoader::boxed(BackendKind::Fast, true),
            Box::new(slow),
            StubLoader::boxed(BackendKind::Classical, true),
        ]);
        init.start();

        // Wait for the fast backend to be published while the unified one blocks
        let deadline = Instant::now() + WAIT;
        while init.available().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(init.available(), vec![BackendKind::Fast]);
        assert_eq!(
            init.wait_until_ready(Duration::from_millis(20)),
            AnalyzerState::Initializing
        );

        release.send(()).unwrap();
        assert_eq!(init.wait_until_ready(WAIT), AnalyzerState::Ready);
        assert_eq!(init.available(), BackendKind::PRIORITY.to_vec());
    }

    #[test]
    fn test_backends_are_kept_in_priority_order() {
        let init = BackendInitializer::new(vec![
            StubLoader::boxed(BackendKind::Classical, true),
            StubLoader::boxed(BackendKind::Fast, true),
        ]);
        init.start();
        init.wait_until_ready(WAIT);
        assert_eq!(
            init.available(),
            vec![BackendKind::Fast, BackendKind::Classical]
        );
    }
}
