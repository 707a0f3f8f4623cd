//! Terminal setup and restoration

use dpilot_core::prelude::*;
use ratatui::DefaultTerminal;

/// Enter raw mode and the alternate screen
///
/// Installs a panic hook first so a panic anywhere leaves a usable terminal.
pub fn init() -> Result<DefaultTerminal> {
    install_panic_hook();
    ratatui::try_init().map_err(|e| Error::TerminalInit(e.to_string()))
}

/// Leave raw mode and the alternate screen
pub fn restore() {
    if let Err(e) = ratatui::try_restore() {
        warn!("Failed to restore terminal: {}", e);
    }
}

/// Install a panic hook that restores the terminal
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));
}
