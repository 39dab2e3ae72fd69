//! Process-wide controller with free functions, for callers that want a single
//! ambient connection instead of carrying a `ConnectionController` around.

pub mod host_api;
pub mod join_api;
pub mod util_api;

use crate::config::LinkConfig;
use crate::controller::ConnectionController;
use once_cell::sync::OnceCell;

static CONTROLLER: OnceCell<ConnectionController> = OnceCell::new();

/// Set the configuration of the process-wide controller. Only effective before
/// its first use; returns false once it exists.
pub fn configure(config: LinkConfig) -> bool {
    CONTROLLER.set(ConnectionController::new(config)).is_ok()
}

/// The process-wide controller, created with default settings on first use
pub fn controller() -> &'static ConnectionController {
    CONTROLLER.get_or_init(|| ConnectionController::new(LinkConfig::default()))
}

pub use host_api::{set_answer, start_host};
pub use join_api::join_host;
pub use util_api::{disconnect, get_fingerprint, is_connected, on_data_received, send_data};
