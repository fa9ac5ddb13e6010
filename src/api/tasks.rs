//! Send task endpoints.
//!
//! Listing is paginated server-side (`page`, `page_size`, default 1/10) and
//! can be filtered by status. Start/pause/resume/delete answer with a
//! human-readable message.

use super::client::{ApiClient, ApiRequest};
use super::error::ApiError;
use super::types::{EmailTask, Envelope, MessageResponse, TaskPage, TaskStatus};

/// Filter and page selection for [`list`].
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// GET /tasks?status=&page=&page_size=
pub async fn list(client: &ApiClient, query: &TaskQuery) -> Result<TaskPage, ApiError> {
    let mut request = ApiRequest::get("/tasks");
    if let Some(ref status) = query.status {
        request = request.query("status", status.as_str());
    }
    if let Some(page) = query.page {
        request = request.query("page", page);
    }
    if let Some(page_size) = query.page_size {
        request = request.query("page_size", page_size);
    }
    client.send(request).await
}

/// GET /tasks/running: running and paused tasks with progress filled in.
pub async fn running(client: &ApiClient) -> Result<Vec<EmailTask>, ApiError> {
    let envelope: Envelope<Vec<EmailTask>> = client.get("/tasks/running").await?;
    Ok(envelope.data)
}

/// Task actions exposed as `POST /tasks/{id}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Start,
    Pause,
    Resume,
}

impl TaskAction {
    fn segment(&self) -> &'static str {
        match self {
            TaskAction::Start => "start",
            TaskAction::Pause => "pause",
            TaskAction::Resume => "resume",
        }
    }
}

pub async fn act(client: &ApiClient, id: u64, action: TaskAction) -> Result<String, ApiError> {
    let path = format!("/tasks/{}/{}", id, action.segment());
    let resp: MessageResponse = client.send(ApiRequest::post(&path)).await?;
    Ok(resp.message)
}

/// DELETE /tasks/{id}
pub async fn delete(client: &ApiClient, id: u64) -> Result<String, ApiError> {
    let resp: MessageResponse = client.delete(&format!("/tasks/{}", id)).await?;
    Ok(resp.message)
}
