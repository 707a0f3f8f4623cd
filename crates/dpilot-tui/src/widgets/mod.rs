//! Custom widgets for the TUI

mod artist_input;
mod device_list;
mod header;
mod status_bar;

pub use artist_input::ArtistInput;
pub use device_list::DeviceList;
pub use header::MainHeader;
pub use status_bar::StatusBar;
