//! Dashboard counters.

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{Envelope, Stats};

/// GET /stats
pub async fn fetch(client: &ApiClient) -> Result<Stats, ApiError> {
    let envelope: Envelope<Stats> = client.get("/stats").await?;
    Ok(envelope.data)
}
