//! Main TUI runner - entry point and event loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use dpilot_app::actions::spawn_flow_event_forwarder;
use dpilot_app::message::Message;
use dpilot_app::process::process_message;
use dpilot_app::{AppState, FlowExecutor, Journey, Settings};
use dpilot_core::prelude::*;
use dpilot_driver::{DeviceSource, SessionFactory, ToolAvailability};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;

use super::{event, render, terminal};

/// How long quitting waits for runs to tear their sessions down
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Run the interactive front end until the user quits
///
/// Every run still alive on quit is stopped and given [`SHUTDOWN_TIMEOUT`]
/// to close its session.
pub async fn run<F, J, S>(
    settings: Settings,
    executor: Arc<FlowExecutor<F, J, S>>,
    tools: ToolAvailability,
) -> Result<()>
where
    F: SessionFactory,
    J: Journey,
    S: DeviceSource + Sync + 'static,
{
    let mut term = terminal::init()?;

    let mut state = AppState::with_settings(settings);
    let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
    let forwarder = spawn_flow_event_forwarder(Arc::clone(&executor), msg_tx.clone());

    let first = match tools.adb_unavailable_message() {
        Some(reason) => Message::AdbUnavailable(reason.to_string()),
        None => Message::RefreshDevices,
    };
    process_message(&mut state, first, &msg_tx, &executor);

    let result = run_loop(&mut term, &mut state, msg_rx, &msg_tx, &executor);

    // Quit path: stop every run and let it close its session
    let stopping = executor.stop_all();
    if stopping > 0 {
        state.set_status(format!("Stopping {} run(s)...", stopping));
        if let Err(e) = term.draw(|frame| render::view(frame, &state)) {
            warn!("Failed to draw shutdown frame: {}", e);
        }
    }
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, executor.wait_idle())
        .await
        .is_err()
    {
        warn!(
            "{} run(s) still active after {:?}, exiting anyway",
            executor.active_count(),
            SHUTDOWN_TIMEOUT
        );
    }

    forwarder.abort();
    terminal::restore();
    info!("TUI closed");

    result
}

/// Main event loop
fn run_loop<F, J, S>(
    terminal: &mut DefaultTerminal,
    state: &mut AppState,
    mut msg_rx: mpsc::Receiver<Message>,
    msg_tx: &mpsc::Sender<Message>,
    executor: &Arc<FlowExecutor<F, J, S>>,
) -> Result<()>
where
    F: SessionFactory,
    J: Journey,
    S: DeviceSource + Sync + 'static,
{
    let status_refresh = state.settings.ui.status_refresh();
    let device_refresh = state.settings.ui.device_refresh();
    let mut last_status_refresh = Instant::now();
    let mut last_device_refresh = Instant::now();

    while !state.should_quit() {
        // Results of background actions and executor events
        while let Ok(msg) = msg_rx.try_recv() {
            process_message(state, msg, msg_tx, executor);
        }

        if last_status_refresh.elapsed() >= status_refresh {
            last_status_refresh = Instant::now();
            process_message(
                state,
                Message::StatusSnapshot(executor.statuses()),
                msg_tx,
                executor,
            );
        }

        if state.adb_available && last_device_refresh.elapsed() >= device_refresh {
            last_device_refresh = Instant::now();
            process_message(state, Message::RefreshDevices, msg_tx, executor);
        }

        terminal
            .draw(|frame| render::view(frame, state))
            .map_err(|e| Error::terminal(e.to_string()))?;

        if let Some(message) = event::poll()? {
            process_message(state, message, msg_tx, executor);
        }
    }

    Ok(())
}
