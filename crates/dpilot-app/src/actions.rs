//! Action handlers: UpdateAction dispatch and background task spawning

use std::sync::Arc;

use dpilot_core::prelude::*;
use dpilot_driver::{DeviceSource, SessionFactory};
use tokio::sync::{broadcast, mpsc};

use crate::executor::FlowExecutor;
use crate::flow::Journey;
use crate::handler::UpdateAction;
use crate::message::Message;

/// Perform an action against the executor; results come back as messages
pub fn handle_action<F, J, S>(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    executor: &Arc<FlowExecutor<F, J, S>>,
) where
    F: SessionFactory,
    J: Journey,
    S: DeviceSource + Sync + 'static,
{
    match action {
        UpdateAction::DiscoverDevices => {
            spawn_device_discovery(Arc::clone(executor), msg_tx);
        }

        UpdateAction::StartFlow { device_id, params } => {
            let accepted = executor.start(&device_id, params);
            send_later(
                msg_tx,
                Message::FlowStartResult {
                    device_id,
                    accepted,
                },
            );
        }

        UpdateAction::StartAll { params } => {
            let executor = Arc::clone(executor);
            tokio::spawn(async move {
                let started = executor.start_all(params).await;
                deliver(&msg_tx, Message::StartAllResult { started }).await;
            });
        }

        UpdateAction::StopFlow { device_id } => {
            let stopped = executor.stop(&device_id);
            send_later(msg_tx, Message::StopResult { device_id, stopped });
        }

        UpdateAction::StopAll => {
            let stopped = executor.stop_all();
            if stopped > 0 {
                debug!("Signalled {} run(s) to stop", stopped);
            }
        }
    }
}

/// Spawn device discovery in background
pub fn spawn_device_discovery<F, J, S>(
    executor: Arc<FlowExecutor<F, J, S>>,
    msg_tx: mpsc::Sender<Message>,
) where
    F: Send + Sync + 'static,
    J: Send + Sync + 'static,
    S: DeviceSource + Sync + 'static,
{
    tokio::spawn(async move {
        let devices = executor.devices().await;
        deliver(&msg_tx, Message::DevicesDiscovered(devices)).await;
    });
}

/// Forward executor phase changes into the message loop
///
/// If the loop falls behind, the missed events are replaced by a full
/// snapshot. Ends when the message loop goes away.
pub fn spawn_flow_event_forwarder<F, J, S>(
    executor: Arc<FlowExecutor<F, J, S>>,
    msg_tx: mpsc::Sender<Message>,
) -> tokio::task::JoinHandle<()>
where
    F: Send + Sync + 'static,
    J: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    let mut events = executor.subscribe();
    tokio::spawn(async move {
        loop {
            let msg = match events.recv().await {
                Ok(event) => Message::Flow(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Missed {} flow event(s), taking a snapshot", missed);
                    Message::StatusSnapshot(executor.statuses())
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if msg_tx.send(msg).await.is_err() {
                break;
            }
        }
    })
}

fn send_later(msg_tx: mpsc::Sender<Message>, msg: Message) {
    tokio::spawn(async move {
        deliver(&msg_tx, msg).await;
    });
}

/// Send a result back to the loop; it is gone once the app quits
async fn deliver(msg_tx: &mpsc::Sender<Message>, msg: Message) {
    if let Err(e) = msg_tx
        .send(msg)
        .await
        .map_err(|e| Error::channel_send(e.to_string()))
    {
        debug!("{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowParams;
    use dpilot_core::prelude::*;
    use dpilot_core::FlowPhase;
    use dpilot_driver::test_utils::{FakeDeviceSource, FakeSessionFactory};
    use dpilot_driver::DeviceDriver;

    struct InstantJourney;

    impl Journey for InstantJourney {
        async fn run<D>(&self, _driver: &D, _params: &FlowParams) -> Result<()>
        where
            D: DeviceDriver + Sync,
        {
            Ok(())
        }
    }

    type TestExecutor = FlowExecutor<FakeSessionFactory, InstantJourney, FakeDeviceSource>;

    fn executor(ids: &[&str]) -> Arc<TestExecutor> {
        Arc::new(FlowExecutor::new(
            FakeSessionFactory::new(),
            InstantJourney,
            FakeDeviceSource::new(ids),
        ))
    }

    #[tokio::test]
    async fn test_discover_sends_devices() {
        let executor = executor(&["emulator-5554", "R5CT227FYRV"]);
        let (tx, mut rx) = mpsc::channel(8);

        handle_action(UpdateAction::DiscoverDevices, tx, &executor);

        match rx.recv().await {
            Some(Message::DevicesDiscovered(devices)) => {
                assert_eq!(devices.len(), 2);
                assert!(devices[0].emulator);
                assert!(!devices[1].emulator);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_start_flow_reports_acceptance() {
        let executor = executor(&[]);
        let (tx, mut rx) = mpsc::channel(8);
        let start = UpdateAction::StartFlow {
            device_id: "emulator-5554".to_string(),
            params: FlowParams::new("Avicii"),
        };

        handle_action(start.clone(), tx.clone(), &executor);
        handle_action(start, tx, &executor);

        let mut accepted = Vec::new();
        for _ in 0..2 {
            match rx.recv().await {
                Some(Message::FlowStartResult { accepted: a, .. }) => accepted.push(a),
                other => panic!("unexpected message: {other:?}"),
            }
        }
        accepted.sort();
        assert_eq!(accepted, vec![false, true]);
        executor.wait_idle().await;
    }

    #[tokio::test]
    async fn test_start_all_reports_count() {
        let executor = executor(&["a", "b"]);
        let (tx, mut rx) = mpsc::channel(8);

        handle_action(
            UpdateAction::StartAll {
                params: FlowParams::new("Avicii"),
            },
            tx,
            &executor,
        );

        assert!(matches!(
            rx.recv().await,
            Some(Message::StartAllResult { started: 2 })
        ));
        executor.wait_idle().await;
    }

    #[tokio::test]
    async fn test_stop_unknown_reports_not_stopped() {
        let executor = executor(&[]);
        let (tx, mut rx) = mpsc::channel(8);

        handle_action(
            UpdateAction::StopFlow {
                device_id: "a".to_string(),
            },
            tx,
            &executor,
        );

        assert!(matches!(
            rx.recv().await,
            Some(Message::StopResult { stopped: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_forwarder_relays_phase_changes() {
        let executor = executor(&[]);
        let (tx, mut rx) = mpsc::channel(32);
        let forwarder = spawn_flow_event_forwarder(Arc::clone(&executor), tx);

        executor.start("emulator-5554", FlowParams::new("Avicii"));
        executor.wait_idle().await;

        let mut last = None;
        while last != Some(FlowPhase::Completed) {
            match rx.recv().await {
                Some(Message::Flow(event)) => last = Some(event.phase),
                other => panic!("unexpected message: {other:?}"),
            }
        }

        drop(rx);
        forwarder.abort();
    }
}
