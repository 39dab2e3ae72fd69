use super::controller;
use crate::error::Result;

/// Host side: start hosting and get the offer text
pub async fn start_host() -> Result<String> {
    controller().start_host().await
}

/// Host side: apply the answer text received from the joiner
pub async fn set_answer(answer: &str) -> Result<()> {
    controller().set_answer(answer).await
}
