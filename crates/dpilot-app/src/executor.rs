//! Multi-device flow executor
//!
//! One tokio task per device run. All per-device state lives in a single
//! map behind one mutex, so "is a run alive?" and "spawn the run" happen
//! atomically. Each run:
//!
//! 1. `Starting` (set by [`FlowExecutor::start`])
//! 2. `Connecting` while the session opens
//! 3. `Running` while the journey runs
//! 4. `Completed`, `Failed(..)` or `Stopped`; the session is always quit
//!
//! Errors and panics are contained in the run's task and recorded as a
//! failed phase. Stopping is cooperative: the run's futures are dropped at
//! their next await point and the session is still torn down.

use dpilot_core::prelude::*;
use dpilot_core::{Device, FlowEvent, FlowPhase};
use dpilot_driver::{AdbBridge, DeviceDriver, DeviceSource, SessionFactory};
use futures_util::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::flow::{ArtistJourney, FlowParams, Journey};

/// Capacity of the phase-change broadcast channel
const EVENT_CAPACITY: usize = 256;

/// Phase recorded when a run's task panics
pub const PANIC_MESSAGE: &str = "run panicked";

/// A live run of one device
struct ActiveRun {
    run_id: u64,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ActiveRun {
    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Everything known about one device id
#[derive(Default)]
struct RunSlot {
    phase: FlowPhase,
    active: Option<ActiveRun>,
}

impl RunSlot {
    fn is_alive(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveRun::is_alive)
    }
}

struct Shared {
    runs: Mutex<BTreeMap<String, RunSlot>>,
    events: broadcast::Sender<FlowEvent>,
    /// Number of live runs
    active: watch::Sender<usize>,
    next_run_id: AtomicU64,
}

impl Shared {
    fn runs(&self) -> MutexGuard<'_, BTreeMap<String, RunSlot>> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, device_id: &str, phase: FlowPhase) {
        // No subscribers is fine
        let _ = self.events.send(FlowEvent::new(device_id, phase));
    }

    /// Record a phase of run `run_id`; ignored once the slot belongs to
    /// another run
    fn set_phase(&self, device_id: &str, run_id: u64, phase: FlowPhase) {
        let mut runs = self.runs();
        let Some(slot) = runs.get_mut(device_id) else {
            return;
        };
        if slot.active.as_ref().map(|r| r.run_id) != Some(run_id) {
            return;
        }
        slot.phase = phase.clone();
        debug!("{} -> {}", device_id, phase);
        // Emitted under the lock so phase events keep their order
        self.emit(device_id, phase);
    }

    /// Record the terminal phase and release the slot
    fn finish(&self, device_id: &str, run_id: u64, phase: FlowPhase) {
        {
            let mut runs = self.runs();
            let Some(slot) = runs.get_mut(device_id) else {
                return;
            };
            if slot.active.as_ref().map(|r| r.run_id) != Some(run_id) {
                return;
            }
            slot.phase = phase.clone();
            slot.active = None;
            info!("{} finished: {}", device_id, phase);
            // Terminal event must precede the active-count drop
            self.emit(device_id, phase);
        }
        self.active.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// How a run ended, before it is turned into a phase
enum RunOutcome {
    Completed,
    Failed(Error),
    Stopped,
    Panicked,
}

impl RunOutcome {
    fn into_phase(self) -> FlowPhase {
        match self {
            RunOutcome::Completed => FlowPhase::Completed,
            RunOutcome::Failed(e) => FlowPhase::failed(e.to_string()),
            RunOutcome::Stopped => FlowPhase::Stopped,
            RunOutcome::Panicked => FlowPhase::failed(PANIC_MESSAGE),
        }
    }
}

/// Runs one journey per device and tracks each device's phase
pub struct FlowExecutor<F, J = ArtistJourney, S = AdbBridge> {
    factory: Arc<F>,
    journey: Arc<J>,
    devices: S,
    shared: Arc<Shared>,
}

impl<F, J, S> FlowExecutor<F, J, S>
where
    F: SessionFactory,
    J: Journey,
    S: DeviceSource + Sync,
{
    pub fn new(factory: F, journey: J, devices: S) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (active, _) = watch::channel(0);
        Self {
            factory: Arc::new(factory),
            journey: Arc::new(journey),
            devices,
            shared: Arc::new(Shared {
                runs: Mutex::new(BTreeMap::new()),
                events,
                active,
                next_run_id: AtomicU64::new(1),
            }),
        }
    }

    /// Start a run for `device_id`
    ///
    /// Returns `false` without side effects if a run for that device is
    /// still alive. Must be called from within a tokio runtime.
    pub fn start(&self, device_id: &str, params: FlowParams) -> bool {
        let run_id = self.shared.next_run_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut runs = self.shared.runs();
            let slot = runs.entry(device_id.to_string()).or_default();
            if slot.is_alive() {
                info!("Run for {} already in progress, not starting another", device_id);
                return false;
            }

            let (stop_tx, stop_rx) = watch::channel(false);
            let span = tracing::info_span!("device", id = %device_id);
            let task = run_device(
                Arc::clone(&self.shared),
                Arc::clone(&self.factory),
                Arc::clone(&self.journey),
                device_id.to_string(),
                run_id,
                params,
                stop_rx,
            )
            .instrument(span);

            slot.phase = FlowPhase::Starting;
            slot.active = Some(ActiveRun {
                run_id,
                stop_tx,
                handle: tokio::spawn(task),
            });
            self.shared.active.send_modify(|n| *n += 1);
            // The task's first phase change waits on this lock
            self.shared.emit(device_id, FlowPhase::Starting);
        }

        info!("Started run for {}", device_id);
        true
    }

    /// Discover devices and start a run on each; returns how many started
    pub async fn start_all(&self, params: FlowParams) -> usize {
        let devices = self.devices.list_devices().await;
        let started = devices
            .iter()
            .filter(|device| self.start(&device.id, params.clone()))
            .count();
        info!("Started {} of {} device(s)", started, devices.len());
        started
    }

    /// Ask the run for `device_id` to stop; returns whether one was alive
    pub fn stop(&self, device_id: &str) -> bool {
        let runs = self.shared.runs();
        match runs.get(device_id).and_then(|slot| slot.active.as_ref()) {
            Some(run) if run.is_alive() => {
                info!("Stopping run for {}", device_id);
                run.stop_tx.send_replace(true);
                true
            }
            _ => false,
        }
    }

    /// Ask every live run to stop; returns how many were signalled
    pub fn stop_all(&self) -> usize {
        let runs = self.shared.runs();
        let mut stopped = 0;
        for (device_id, run) in runs
            .iter()
            .filter_map(|(id, slot)| slot.active.as_ref().map(|run| (id, run)))
            .filter(|(_, run)| run.is_alive())
        {
            debug!("Stopping run for {}", device_id);
            run.stop_tx.send_replace(true);
            stopped += 1;
        }
        stopped
    }
}

impl<F, J, S> FlowExecutor<F, J, S>
where
    S: DeviceSource + Sync,
{
    /// Currently ready devices, straight from the device source
    pub async fn devices(&self) -> Vec<Device> {
        self.devices.list_devices().await
    }
}

impl<F, J, S> FlowExecutor<F, J, S> {
    /// Last recorded phase; `NotStarted` for unknown ids
    pub fn status(&self, device_id: &str) -> FlowPhase {
        self.shared
            .runs()
            .get(device_id)
            .map(|slot| slot.phase.clone())
            .unwrap_or_default()
    }

    /// Phase of every device ever started, ordered by id
    pub fn statuses(&self) -> Vec<(String, FlowPhase)> {
        self.shared
            .runs()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.phase.clone()))
            .collect()
    }

    pub fn is_running(&self, device_id: &str) -> bool {
        self.shared
            .runs()
            .get(device_id)
            .is_some_and(RunSlot::is_alive)
    }

    pub fn active_count(&self) -> usize {
        *self.shared.active.borrow()
    }

    /// Phase changes of every run, from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.shared.events.subscribe()
    }

    /// Resolves once no run is alive
    pub async fn wait_idle(&self) {
        let mut active = self.shared.active.subscribe();
        // The sender lives in `self`, so this cannot fail while we wait
        let _ = active.wait_for(|n| *n == 0).await;
    }
}

/// Body of one run's task
async fn run_device<F, J>(
    shared: Arc<Shared>,
    factory: Arc<F>,
    journey: Arc<J>,
    device_id: String,
    run_id: u64,
    params: FlowParams,
    mut stop_rx: watch::Receiver<bool>,
) where
    F: SessionFactory,
    J: Journey,
{
    let outcome = AssertUnwindSafe(drive(
        &shared,
        factory.as_ref(),
        journey.as_ref(),
        &device_id,
        run_id,
        &params,
        &mut stop_rx,
    ))
    .catch_unwind()
    .await
    .unwrap_or_else(|_| {
        error!("Run for {} panicked", device_id);
        RunOutcome::Panicked
    });

    match &outcome {
        RunOutcome::Failed(e) if e.is_recoverable() => {
            warn!("Run for {} failed: {}", device_id, e)
        }
        RunOutcome::Failed(e) => error!("Run for {} failed: {:?}", device_id, e),
        _ => {}
    }

    shared.finish(&device_id, run_id, outcome.into_phase());
}

async fn drive<F, J>(
    shared: &Shared,
    factory: &F,
    journey: &J,
    device_id: &str,
    run_id: u64,
    params: &FlowParams,
    stop_rx: &mut watch::Receiver<bool>,
) -> RunOutcome
where
    F: SessionFactory,
    J: Journey,
{
    shared.set_phase(device_id, run_id, FlowPhase::Connecting);

    let session = tokio::select! {
        biased;
        _ = stop_requested(stop_rx) => return RunOutcome::Stopped,
        opened = factory.open(device_id) => match opened {
            Ok(session) => session,
            Err(e) => return RunOutcome::Failed(e),
        },
    };

    shared.set_phase(device_id, run_id, FlowPhase::Running);

    let outcome = tokio::select! {
        biased;
        _ = stop_requested(stop_rx) => RunOutcome::Stopped,
        result = AssertUnwindSafe(journey.run(&session, params)).catch_unwind() => match result {
            Ok(Ok(())) => RunOutcome::Completed,
            Ok(Err(e)) => RunOutcome::Failed(e),
            Err(_) => {
                error!("Journey on {} panicked", device_id);
                RunOutcome::Panicked
            }
        },
    };

    close_session(&session, device_id).await;
    outcome
}

async fn close_session<D>(session: &D, device_id: &str)
where
    D: DeviceDriver + Sync,
{
    match session.quit().await {
        Ok(()) => debug!("Session for {} closed", device_id),
        Err(e) => warn!("Closing the session for {} failed: {}", device_id, e),
    }
}

/// Resolves once a stop was requested; never if the executor went away
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    if stop_rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpilot_driver::test_utils::{FakeDeviceSource, FakeDriver, FakeSessionFactory};
    use dpilot_driver::Locator;
    use std::time::Duration;

    /// Completes immediately
    struct InstantJourney;

    impl Journey for InstantJourney {
        async fn run<D>(&self, _driver: &D, _params: &FlowParams) -> Result<()>
        where
            D: DeviceDriver + Sync,
        {
            Ok(())
        }
    }

    /// Blocks on a lookup that never completes
    struct HangingJourney;

    impl Journey for HangingJourney {
        async fn run<D>(&self, driver: &D, _params: &FlowParams) -> Result<()>
        where
            D: DeviceDriver + Sync,
        {
            driver.find_elements(&hanging_locator()).await?;
            Ok(())
        }
    }

    /// Fails with the artist name as the message
    struct FailingJourney;

    impl Journey for FailingJourney {
        async fn run<D>(&self, _driver: &D, params: &FlowParams) -> Result<()>
        where
            D: DeviceDriver + Sync,
        {
            Err(Error::app_not_found("com.example", Some(params.artist.clone())))
        }
    }

    struct PanickingJourney;

    impl Journey for PanickingJourney {
        async fn run<D>(&self, driver: &D, _params: &FlowParams) -> Result<()>
        where
            D: DeviceDriver + Sync,
        {
            driver.current_package().await?;
            panic!("journey blew up");
        }
    }

    fn hanging_locator() -> Locator {
        Locator::id("never")
    }

    fn hanging_factory() -> FakeSessionFactory {
        FakeSessionFactory::new()
            .with_builder(|_| FakeDriver::new().with_hanging_lookup(&hanging_locator()))
    }

    fn params() -> FlowParams {
        FlowParams::new("Martin Garrix")
    }

    #[tokio::test]
    async fn test_status_of_unknown_device_is_not_started() {
        let executor =
            FlowExecutor::new(FakeSessionFactory::new(), InstantJourney, FakeDeviceSource::default());

        assert_eq!(executor.status("never-seen"), FlowPhase::NotStarted);
        assert!(!executor.is_running("never-seen"));
        assert!(executor.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_completed_run() {
        let factory = FakeSessionFactory::new();
        let executor =
            FlowExecutor::new(factory.clone(), InstantJourney, FakeDeviceSource::default());

        assert!(executor.start("emulator-5554", params()));
        executor.wait_idle().await;

        assert_eq!(executor.status("emulator-5554"), FlowPhase::Completed);
        assert_eq!(factory.driver("emulator-5554").unwrap().quits(), 1);
        assert_eq!(executor.active_count(), 0);
    }

    #[tokio::test]
    async fn test_second_start_while_alive_is_rejected() {
        let executor =
            FlowExecutor::new(hanging_factory(), HangingJourney, FakeDeviceSource::default());

        assert!(executor.start("emulator-5554", params()));
        assert!(!executor.start("emulator-5554", params()));
        assert!(executor.is_running("emulator-5554"));
        assert_eq!(executor.active_count(), 1);

        // Other devices are independent
        assert!(executor.start("R5CT227FYRV", params()));
        assert_eq!(executor.active_count(), 2);

        executor.stop_all();
        executor.wait_idle().await;
    }

    #[tokio::test]
    async fn test_restart_after_terminal_phase() {
        let executor =
            FlowExecutor::new(FakeSessionFactory::new(), InstantJourney, FakeDeviceSource::default());

        assert!(executor.start("emulator-5554", params()));
        executor.wait_idle().await;
        assert!(executor.start("emulator-5554", params()));
        executor.wait_idle().await;

        assert_eq!(executor.status("emulator-5554"), FlowPhase::Completed);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_truncated() {
        let long_cause = "x".repeat(200);
        let executor =
            FlowExecutor::new(FakeSessionFactory::new(), FailingJourney, FakeDeviceSource::default());

        executor.start("emulator-5554", FlowParams::new(long_cause));
        executor.wait_idle().await;

        let phase = executor.status("emulator-5554");
        assert!(phase.is_error());
        let label = phase.label();
        assert!(label.starts_with("Error: [APP_NOT_FOUND]: xxx"));
        assert_eq!(label.chars().count(), "Error: ".len() + 50);
    }

    #[tokio::test]
    async fn test_session_failure_does_not_affect_other_devices() {
        let factory = FakeSessionFactory::new().with_failure("bad-device");
        let executor =
            FlowExecutor::new(factory.clone(), InstantJourney, FakeDeviceSource::default());

        executor.start("bad-device", params());
        executor.start("good-device", params());
        executor.wait_idle().await;

        assert!(executor.status("bad-device").is_error());
        assert_eq!(executor.status("good-device"), FlowPhase::Completed);
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_session_closed() {
        let factory = FakeSessionFactory::new();
        let executor =
            FlowExecutor::new(factory.clone(), PanickingJourney, FakeDeviceSource::default());

        executor.start("emulator-5554", params());
        executor.wait_idle().await;

        assert_eq!(
            executor.status("emulator-5554"),
            FlowPhase::failed(PANIC_MESSAGE)
        );
        assert_eq!(factory.driver("emulator-5554").unwrap().quits(), 1);
        // The executor keeps working
        assert!(executor.start("emulator-5554", params()));
        executor.wait_idle().await;
    }

    #[tokio::test]
    async fn test_quit_failure_is_only_logged() {
        let factory = FakeSessionFactory::new()
            .with_driver("emulator-5554", FakeDriver::new().with_quit_error());
        let executor = FlowExecutor::new(factory, InstantJourney, FakeDeviceSource::default());

        executor.start("emulator-5554", params());
        executor.wait_idle().await;

        assert_eq!(executor.status("emulator-5554"), FlowPhase::Completed);
    }

    #[tokio::test]
    async fn test_stop_running_journey() {
        let factory = hanging_factory();
        let executor =
            FlowExecutor::new(factory.clone(), HangingJourney, FakeDeviceSource::default());
        let mut events = executor.subscribe();

        executor.start("emulator-5554", params());
        // Wait until the journey is in flight
        loop {
            let event = events.recv().await.unwrap();
            if event.phase == FlowPhase::Running {
                break;
            }
        }

        assert!(executor.stop("emulator-5554"));
        executor.wait_idle().await;

        assert_eq!(executor.status("emulator-5554"), FlowPhase::Stopped);
        assert_eq!(factory.driver("emulator-5554").unwrap().quits(), 1);
        assert!(!executor.stop("emulator-5554"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_connecting_opens_no_session() {
        let factory = FakeSessionFactory::new().with_open_delay(Duration::from_secs(60));
        let executor =
            FlowExecutor::new(factory.clone(), InstantJourney, FakeDeviceSource::default());

        executor.start("emulator-5554", params());
        assert!(executor.stop("emulator-5554"));
        executor.wait_idle().await;

        assert_eq!(executor.status("emulator-5554"), FlowPhase::Stopped);
        assert!(factory.driver("emulator-5554").is_none());
    }

    #[tokio::test]
    async fn test_stop_unknown_device() {
        let executor =
            FlowExecutor::new(FakeSessionFactory::new(), InstantJourney, FakeDeviceSource::default());
        assert!(!executor.stop("nope"));
        assert_eq!(executor.stop_all(), 0);
    }

    #[tokio::test]
    async fn test_events_follow_phase_order() {
        let executor =
            FlowExecutor::new(FakeSessionFactory::new(), InstantJourney, FakeDeviceSource::default());
        let mut events = executor.subscribe();

        executor.start("emulator-5554", params());
        executor.wait_idle().await;

        let mut phases = Vec::new();
        while let Ok(event) = events.try_recv() {
            assert_eq!(event.device_id, "emulator-5554");
            phases.push(event.phase);
        }
        assert_eq!(
            phases,
            vec![
                FlowPhase::Starting,
                FlowPhase::Connecting,
                FlowPhase::Running,
                FlowPhase::Completed,
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_events_stay_ordered_across_worker_threads() {
        let executor =
            FlowExecutor::new(FakeSessionFactory::new(), InstantJourney, FakeDeviceSource::default());

        for round in 0..200 {
            let mut events = executor.subscribe();
            assert!(executor.start("emulator-5554", params()));
            executor.wait_idle().await;

            let mut phases = Vec::new();
            while let Ok(event) = events.try_recv() {
                phases.push(event.phase);
            }
            assert_eq!(
                phases,
                vec![
                    FlowPhase::Starting,
                    FlowPhase::Connecting,
                    FlowPhase::Running,
                    FlowPhase::Completed,
                ],
                "round {}",
                round
            );
        }
    }

    #[tokio::test]
    async fn test_start_all_counts_accepted_runs() {
        let devices = FakeDeviceSource::new(&["emulator-5554", "emulator-5556", "R5CT227FYRV"]);
        let executor = FlowExecutor::new(hanging_factory(), HangingJourney, devices.clone());

        assert!(executor.start("emulator-5556", params()));
        let started = executor.start_all(params()).await;

        assert_eq!(started, 2);
        assert_eq!(executor.active_count(), 3);
        assert_eq!(executor.stop_all(), 3);
        executor.wait_idle().await;

        let statuses = executor.statuses();
        assert_eq!(statuses.len(), 3);
        assert!(statuses.iter().all(|(_, phase)| *phase == FlowPhase::Stopped));
    }

    #[tokio::test]
    async fn test_start_all_without_devices() {
        let executor =
            FlowExecutor::new(FakeSessionFactory::new(), InstantJourney, FakeDeviceSource::default());
        assert_eq!(executor.start_all(params()).await, 0);
        executor.wait_idle().await;
    }

    #[tokio::test]
    async fn test_terminal_phase_does_not_revert() {
        let executor =
            FlowExecutor::new(FakeSessionFactory::new(), InstantJourney, FakeDeviceSource::default());

        executor.start("emulator-5554", params());
        executor.wait_idle().await;
        tokio::task::yield_now().await;

        for _ in 0..3 {
            assert_eq!(executor.status("emulator-5554"), FlowPhase::Completed);
            tokio::task::yield_now().await;
        }
    }
}
