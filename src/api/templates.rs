//! Email template endpoints.

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{EmailTemplate, Envelope, MessageResponse};

/// GET /templates
pub async fn list(client: &ApiClient) -> Result<Vec<EmailTemplate>, ApiError> {
    let envelope: Envelope<Vec<EmailTemplate>> = client.get("/templates").await?;
    Ok(envelope.data)
}

/// GET /templates/{id}
pub async fn get(client: &ApiClient, id: u64) -> Result<EmailTemplate, ApiError> {
    let envelope: Envelope<EmailTemplate> = client.get(&format!("/templates/{}", id)).await?;
    Ok(envelope.data)
}

/// DELETE /templates/{id}
pub async fn delete(client: &ApiClient, id: u64) -> Result<String, ApiError> {
    let resp: MessageResponse = client.delete(&format!("/templates/{}", id)).await?;
    Ok(resp.message)
}
