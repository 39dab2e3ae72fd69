use super::controller;
use crate::error::Result;

/// Joiner side: join a host with its offer text and get the answer text back
pub async fn join_host(offer: &str) -> Result<String> {
    controller().join_host(offer).await
}
