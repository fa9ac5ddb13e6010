//! Payload types for the mailer backend API.
//!
//! Field names follow the backend's snake_case JSON. Most handlers wrap their
//! result as `{"data": ...}`; state-changing task endpoints answer
//! `{"message": "..."}`.

use serde::{Deserialize, Serialize};

/// The `{"data": ...}` wrapper around most payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// `{"message": "..."}` returned by actions without a result.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Counters shown on the overview screen (GET /stats).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Stats {
    pub template_count: i64,
    pub pending_count: i64,
    pub sent_count: i64,
    pub failed_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: u64,
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub content: String,
    /// JSON-encoded variable list, stored as a string by the backend.
    #[serde(default)]
    pub variables: Option<String>,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Lifecycle of a send task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Paused,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Paused => "paused",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "paused" => Ok(TaskStatus::Paused),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailTask {
    pub id: u64,
    pub name: String,
    pub template_id: u64,
    #[serde(default)]
    pub data_source: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub sent_count: i64,
    #[serde(default)]
    pub fail_count: i64,
    /// Percentage, only filled in by GET /tasks/running.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub estimated_remaining: String,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One page of GET /tasks. Pagination fields sit next to `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskPage {
    pub data: Vec<EmailTask>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_page() {
        let json = r#"{
            "data": [{
                "id": 3, "name": "spring promo", "template_id": 1,
                "data_source": "excel", "status": "running",
                "total_count": 200, "sent_count": 50, "fail_count": 2,
                "progress": 26.0, "estimated_remaining": "3m0s",
                "scheduled_at": null, "started_at": "2024-04-01T10:00:00Z",
                "completed_at": null, "created_at": "2024-04-01T09:00:00Z",
                "template": {"id": 1}
            }],
            "total": 1, "page": 1, "page_size": 10
        }"#;

        let page: TaskPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].status, TaskStatus::Running);
        assert_eq!(page.data[0].sent_count, 50);
        assert!(page.data[0].scheduled_at.is_none());
    }

    #[test]
    fn test_parse_stats_envelope() {
        let json = r#"{"data":{"template_count":4,"pending_count":1,"sent_count":120,"failed_count":3}}"#;
        let env: Envelope<Stats> = serde_json::from_str(json).unwrap();
        assert_eq!(
            env.data,
            Stats {
                template_count: 4,
                pending_count: 1,
                sent_count: 120,
                failed_count: 3
            }
        );
    }

    #[test]
    fn test_task_status_round_trip_names() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Paused,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("archived".parse::<TaskStatus>().is_err());
    }
}
