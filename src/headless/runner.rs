//! Headless batch runner - one run per device, no TUI
//!
//! Discovers every ready device, starts a run on each, reports phase changes
//! as [`HeadlessEvent`]s and returns once every run has ended. A shutdown
//! signal stops all runs and still waits for their sessions to close.

use std::future::Future;

use dpilot_app::{FlowExecutor, FlowParams, Journey};
use dpilot_core::prelude::*;
use dpilot_core::FlowPhase;
use dpilot_driver::{find_device, DeviceSource, SessionFactory};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::HeadlessEvent;

/// Totals of one headless batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub devices: usize,
    pub started: usize,
    pub completed: usize,
    pub failed: usize,
    pub stopped: usize,
}

impl RunSummary {
    /// At least one run and none of them failed
    pub fn is_success(&self) -> bool {
        self.started > 0 && self.failed == 0
    }

    fn record(&mut self, phase: &FlowPhase) {
        match phase {
            FlowPhase::Completed => self.completed += 1,
            FlowPhase::Failed(_) => self.failed += 1,
            FlowPhase::Stopped => self.stopped += 1,
            other => warn!("Run ended in non-terminal phase {:?}", other),
        }
    }
}

/// Run the journey on every discovered device until all runs end
///
/// `target` limits the batch to the device whose serial matches it (exact,
/// else case-insensitive prefix). Every event is passed to `emit`; the last
/// one is always the summary.
pub async fn run_headless<F, J, S>(
    executor: &FlowExecutor<F, J, S>,
    params: FlowParams,
    target: Option<&str>,
    shutdown: impl Future<Output = ()>,
    mut emit: impl FnMut(HeadlessEvent),
) -> RunSummary
where
    F: SessionFactory,
    J: Journey,
    S: DeviceSource + Sync,
{
    let mut summary = RunSummary::default();

    let discovered = executor.devices().await;
    for device in &discovered {
        emit(HeadlessEvent::device_detected(device));
    }

    if discovered.is_empty() {
        warn!("No devices found, nothing to run");
        emit(HeadlessEvent::error("No devices found", false));
        emit(HeadlessEvent::summary(&summary));
        return summary;
    }

    let devices = match target {
        Some(specifier) => match find_device(&discovered, specifier) {
            Some(device) => vec![device.clone()],
            None => {
                warn!("No device matches '{}'", specifier);
                emit(HeadlessEvent::error(
                    format!("No device matches '{}'", specifier),
                    false,
                ));
                emit(HeadlessEvent::summary(&summary));
                return summary;
            }
        },
        None => discovered,
    };
    summary.devices = devices.len();

    // Subscribe before starting so no phase change is missed
    let mut events = executor.subscribe();

    let mut started = Vec::new();
    for device in &devices {
        if executor.start(&device.id, params.clone()) {
            emit(HeadlessEvent::flow_started(&device.id, &params.artist));
            started.push(device.id.clone());
        } else {
            emit(HeadlessEvent::flow_rejected(
                &device.id,
                format!("A flow is already running on {}", device.id),
            ));
        }
    }
    summary.started = started.len();
    info!("Started {} of {} device(s)", started.len(), devices.len());

    tokio::pin!(shutdown);
    let mut stopping = false;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown, if !stopping => {
                stopping = true;
                let signalled = executor.stop_all();
                info!("Shutdown requested, stopping {} run(s)", signalled);
            }
            event = events.recv() => match event {
                Ok(event) => emit(HeadlessEvent::flow_status(&event)),
                Err(RecvError::Lagged(missed)) => {
                    warn!("Missed {} flow event(s)", missed);
                }
                Err(RecvError::Closed) => break,
            },
            _ = executor.wait_idle() => break,
        }
    }

    // Terminal events sent just before the last run released its slot
    loop {
        match events.try_recv() {
            Ok(event) => emit(HeadlessEvent::flow_status(&event)),
            Err(TryRecvError::Lagged(missed)) => warn!("Missed {} flow event(s)", missed),
            Err(_) => break,
        }
    }

    for device_id in &started {
        summary.record(&executor.status(device_id));
    }

    info!(
        "Headless batch finished: {} completed, {} failed, {} stopped",
        summary.completed, summary.failed, summary.stopped
    );
    emit(HeadlessEvent::summary(&summary));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpilot_driver::test_utils::{FakeDeviceSource, FakeDriver, FakeSessionFactory};
    use dpilot_driver::{DeviceDriver, Locator};
    use std::time::Duration;

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
            driver.find_elements(&Locator::id("never")).await?;
            Ok(())
        }
    }

    fn hanging_factory() -> FakeSessionFactory {
        FakeSessionFactory::new()
            .with_builder(|_| FakeDriver::new().with_hanging_lookup(&Locator::id("never")))
    }

    fn event_name(event: &HeadlessEvent) -> &'static str {
        match event {
            HeadlessEvent::DeviceDetected { .. } => "device_detected",
            HeadlessEvent::FlowStarted { .. } => "flow_started",
            HeadlessEvent::FlowRejected { .. } => "flow_rejected",
            HeadlessEvent::FlowStatus { .. } => "flow_status",
            HeadlessEvent::Summary { .. } => "summary",
            HeadlessEvent::Error { .. } => "error",
        }
    }

    fn terminal_statuses(events: &[HeadlessEvent]) -> Vec<(String, String)> {
        let mut statuses: Vec<(String, String)> = events
            .iter()
            .filter_map(|event| match event {
                HeadlessEvent::FlowStatus {
                    device_id,
                    status,
                    terminal: true,
                    ..
                } => Some((device_id.clone(), status.clone())),
                _ => None,
            })
            .collect();
        statuses.sort();
        statuses
    }

    #[tokio::test]
    async fn test_no_devices_reports_error_and_empty_summary() {
        let executor = FlowExecutor::new(
            FakeSessionFactory::new(),
            InstantJourney,
            FakeDeviceSource::default(),
        );
        let mut events = Vec::new();

        let summary = run_headless(
            &executor,
            FlowParams::new("Martin Garrix"),
            None,
            std::future::pending(),
            |event| events.push(event),
        )
        .await;

        assert_eq!(summary, RunSummary::default());
        assert!(!summary.is_success());
        let names: Vec<_> = events.iter().map(event_name).collect();
        assert_eq!(names, vec!["error", "summary"]);
    }

    #[tokio::test]
    async fn test_every_device_runs_and_summary_is_last() {
        let factory = FakeSessionFactory::new().with_failure("R5CT227FYRV");
        let executor = FlowExecutor::new(
            factory.clone(),
            InstantJourney,
            FakeDeviceSource::new(&["emulator-5554", "R5CT227FYRV"]),
        );
        let mut events = Vec::new();

        let summary = run_headless(
            &executor,
            FlowParams::new("Martin Garrix"),
            None,
            std::future::pending(),
            |event| events.push(event),
        )
        .await;

        assert_eq!(
            summary,
            RunSummary {
                devices: 2,
                started: 2,
                completed: 1,
                failed: 1,
                stopped: 0,
            }
        );
        assert!(!summary.is_success());

        let names: Vec<_> = events.iter().map(event_name).collect();
        assert_eq!(
            &names[..4],
            &["device_detected", "device_detected", "flow_started", "flow_started"]
        );
        assert_eq!(names.last(), Some(&"summary"));

        let terminal = terminal_statuses(&events);
        assert_eq!(terminal.len(), 2);
        assert!(terminal[0].1.starts_with("Error: "));
        assert_eq!(terminal[1], ("emulator-5554".to_string(), "Completed".to_string()));

        assert_eq!(factory.driver("emulator-5554").map(|d| d.quits()), Some(1));
    }

    #[tokio::test]
    async fn test_busy_device_is_rejected() {
        let executor = FlowExecutor::new(
            hanging_factory(),
            HangingJourney,
            FakeDeviceSource::new(&["emulator-5554"]),
        );
        assert!(executor.start("emulator-5554", FlowParams::new("Avicii")));

        let mut events = Vec::new();
        let summary = run_headless(
            &executor,
            FlowParams::new("Martin Garrix"),
            None,
            async {},
            |event| events.push(event),
        )
        .await;

        assert_eq!(summary.started, 0);
        assert!(events.iter().any(|event| matches!(
            event,
            HeadlessEvent::FlowRejected { device_id, .. } if device_id == "emulator-5554"
        )));
        // Shutdown fired immediately and stopped the pre-existing run too
        assert_eq!(executor.status("emulator-5554"), FlowPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_hanging_runs() {
        let factory = hanging_factory();
        let executor = FlowExecutor::new(
            factory.clone(),
            HangingJourney,
            FakeDeviceSource::new(&["emulator-5554", "emulator-5556"]),
        );
        let mut events = Vec::new();

        let summary = run_headless(
            &executor,
            FlowParams::new("Martin Garrix"),
            None,
            tokio::time::sleep(Duration::from_secs(5)),
            |event| events.push(event),
        )
        .await;

        assert_eq!(summary.started, 2);
        assert_eq!(summary.stopped, 2);
        assert_eq!(
            terminal_statuses(&events),
            vec![
                ("emulator-5554".to_string(), "Stopped".to_string()),
                ("emulator-5556".to_string(), "Stopped".to_string()),
            ]
        );
        for id in ["emulator-5554", "emulator-5556"] {
            assert_eq!(factory.driver(id).map(|d| d.quits()), Some(1));
        }
    }

    #[tokio::test]
    async fn test_target_limits_batch_to_matching_device() {
        let factory = FakeSessionFactory::new();
        let executor = FlowExecutor::new(
            factory.clone(),
            InstantJourney,
            FakeDeviceSource::new(&["emulator-5554", "R5CT227FYRV"]),
        );
        let mut events = Vec::new();

        let summary = run_headless(
            &executor,
            FlowParams::new("Martin Garrix"),
            Some("r5ct"),
            std::future::pending(),
            |event| events.push(event),
        )
        .await;

        assert_eq!(summary.devices, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(factory.opened(), vec!["R5CT227FYRV"]);
        // Both devices are still reported as detected
        let detected = events
            .iter()
            .filter(|event| matches!(event, HeadlessEvent::DeviceDetected { .. }))
            .count();
        assert_eq!(detected, 2);
    }

    #[tokio::test]
    async fn test_unmatched_target_runs_nothing() {
        let factory = FakeSessionFactory::new();
        let executor = FlowExecutor::new(
            factory.clone(),
            InstantJourney,
            FakeDeviceSource::new(&["emulator-5554"]),
        );
        let mut events = Vec::new();

        let summary = run_headless(
            &executor,
            FlowParams::new("Martin Garrix"),
            Some("R5CT"),
            std::future::pending(),
            |event| events.push(event),
        )
        .await;

        assert_eq!(summary.started, 0);
        assert!(factory.opened().is_empty());
        assert!(matches!(
            &events[1],
            HeadlessEvent::Error { message, fatal: false, .. } if message.contains("R5CT")
        ));
    }

    #[test]
    fn test_summary_success() {
        let summary = RunSummary {
            devices: 2,
            started: 2,
            completed: 1,
            failed: 0,
            stopped: 1,
        };
        assert!(summary.is_success());
    }
}
