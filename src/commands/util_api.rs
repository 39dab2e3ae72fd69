use super::controller;
use crate::error::SendError;

/// Send text over the data channel
pub fn send_data(data: impl Into<String>) -> Result<(), SendError> {
    controller().send(data)
}

/// Register the handler called for each received message
pub fn on_data_received<F>(handler: F)
where
    F: Fn(String) + Send + Sync + 'static,
{
    controller().on_data_received(handler)
}

/// Data channel is open
pub fn is_connected() -> bool {
    controller().is_connected()
}

/// Manual disconnect
pub async fn disconnect() {
    controller().close().await
}

/// Verification code to compare with the other side
pub async fn get_fingerprint() -> Option<String> {
    controller().verification_code().await
}
