//! Shell commands for the console.
//!
//! Each command takes the shared [`AppState`], does one thing, and returns
//! the text to print. Failures come back as a `String` with context; the API
//! pipeline has already notified the user by then, so callers only log them.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::api::client::ApiRequest;
use crate::api::error::ApiError;
use crate::api::tasks::{self, TaskAction, TaskQuery};
use crate::api::types::{EmailTask, EmailTemplate, Stats};
use crate::api::{stats, templates};
use crate::nav::Navigation;
use crate::state::AppState;

/// Run `command` unless `cancel` fires first.
///
/// An interrupted command is dropped together with its in-flight request, so
/// nothing is decoded and no notification is sent.
pub async fn until_cancelled<F>(cancel: &CancellationToken, command: F) -> Result<String, String>
where
    F: Future<Output = Result<String, String>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            log::debug!("Command interrupted");
            Err(ApiError::Cancelled.to_string())
        }
        result = command => result,
    }
}

/// Backend, session and landing route at a glance.
pub fn status(state: &AppState) -> Result<String, String> {
    let home = state
        .router
        .default_path()
        .map_err(|e| format!("Invalid route table: {}", e))?;
    let session = if state.is_signed_in() {
        "signed in"
    } else {
        "signed out"
    };
    Ok(format!(
        "api      {}\nsession  {}\nhome     {}",
        state.api.base_url(),
        session,
        home
    ))
}

/// Sidebar entries, one per line: `path  title  [icon]`.
pub fn routes(state: &AppState) -> String {
    let menu = state.router.menu();
    let width = menu.iter().map(|m| m.path.len()).max().unwrap_or(0);
    menu.iter()
        .map(|entry| match entry.icon {
            Some(ref icon) => format!("{:<width$}  {}  [{}]", entry.path, entry.title, icon),
            None => format!("{:<width$}  {}", entry.path, entry.title),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Navigate to `location` and render the screen's data.
pub async fn open(state: &AppState, location: &str) -> Result<String, String> {
    let nav = state
        .router
        .navigate(location)
        .await
        .map_err(|e| format!("Navigation failed: {}", e))?;

    let mut lines = vec![header(&nav)];
    lines.extend(screen_body(state, &nav).await?);
    Ok(lines.join("\n"))
}

fn header(nav: &Navigation) -> String {
    let route = &nav.route;
    let mut line = format!(
        "== {} ({})",
        route.title().unwrap_or("Untitled"),
        route.path
    );
    if let Some(ref from) = route.redirected_from {
        line.push_str(&format!(" <- {}", from));
    }
    if route.breadcrumbs().len() > 1 {
        line.push_str(&format!("\n   {}", route.breadcrumbs().join(" / ")));
    }
    line
}

/// Lines shown under the header, fetched for the screens that have data.
async fn screen_body(state: &AppState, nav: &Navigation) -> Result<Vec<String>, String> {
    let component = nav.screen().map(|s| s.component().to_string());
    match component.as_deref() {
        Some("Dashboard") => {
            let stats = stats::fetch(&state.api)
                .await
                .map_err(|e| format!("Failed to load stats: {}", e))?;
            Ok(render_stats(&stats))
        }
        Some("Templates") => {
            let list = templates::list(&state.api)
                .await
                .map_err(|e| format!("Failed to load templates: {}", e))?;
            Ok(render_templates(&list))
        }
        Some("Tasks") => {
            let page = tasks::list(&state.api, &TaskQuery::default())
                .await
                .map_err(|e| format!("Failed to load tasks: {}", e))?;
            let mut lines = render_tasks(&page.data);
            lines.push(format!(
                "page {} ({} per page), {} total",
                page.page, page.page_size, page.total
            ));
            Ok(lines)
        }
        Some(other) => Ok(vec![format!("({} has nothing to list)", other)]),
        None => Ok(Vec::new()),
    }
}

/// Raw GET of an API path, printed as pretty JSON. Aborts when `cancel`
/// fires.
pub async fn get(
    state: &AppState,
    path: &str,
    cancel: &CancellationToken,
) -> Result<String, String> {
    let value: serde_json::Value = state
        .api
        .send_cancellable(ApiRequest::get(path), cancel)
        .await
        .map_err(|e| format!("GET {} failed: {}", path, e))?;
    serde_json::to_string_pretty(&value).map_err(|e| format!("Failed to format response: {}", e))
}

/// List tasks, optionally filtered.
pub async fn list_tasks(state: &AppState, query: &TaskQuery) -> Result<String, String> {
    let page = tasks::list(&state.api, query)
        .await
        .map_err(|e| format!("Failed to load tasks: {}", e))?;
    let mut lines = render_tasks(&page.data);
    lines.push(format!("{} total", page.total));
    Ok(lines.join("\n"))
}

/// Running and paused tasks with progress.
pub async fn running_tasks(state: &AppState) -> Result<String, String> {
    let running = tasks::running(&state.api)
        .await
        .map_err(|e| format!("Failed to load running tasks: {}", e))?;
    if running.is_empty() {
        return Ok("No running tasks".to_string());
    }
    Ok(running
        .iter()
        .map(|t| {
            format!(
                "#{} {} {:.1}% ({}/{} sent, {} failed) eta {}",
                t.id,
                t.name,
                t.progress,
                t.sent_count,
                t.total_count,
                t.fail_count,
                if t.estimated_remaining.is_empty() {
                    "-"
                } else {
                    t.estimated_remaining.as_str()
                }
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

pub async fn task_action(state: &AppState, id: u64, action: TaskAction) -> Result<String, String> {
    tasks::act(&state.api, id, action)
        .await
        .map_err(|e| format!("Task {} {:?} failed: {}", id, action, e))
}

pub async fn delete_task(state: &AppState, id: u64) -> Result<String, String> {
    tasks::delete(&state.api, id)
        .await
        .map_err(|e| format!("Failed to delete task {}: {}", id, e))
}

pub async fn show_template(state: &AppState, id: u64) -> Result<String, String> {
    let template = templates::get(&state.api, id)
        .await
        .map_err(|e| format!("Failed to load template {}: {}", id, e))?;
    Ok(format!(
        "#{} {} (v{}, {})\nSubject: {}\n\n{}",
        template.id,
        template.name,
        template.version,
        template.status,
        template.subject,
        template.content
    ))
}

pub async fn delete_template(state: &AppState, id: u64) -> Result<String, String> {
    templates::delete(&state.api, id)
        .await
        .map_err(|e| format!("Failed to delete template {}: {}", id, e))
}

/// Store a session token for subsequent requests.
pub fn login(state: &AppState, token: &str) -> Result<String, String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("Token must not be empty".to_string());
    }
    state
        .credentials
        .store(token)
        .map_err(|e| format!("Failed to store token: {}", e))?;
    log::info!("Session token stored");
    Ok("Signed in".to_string())
}

pub fn logout(state: &AppState) -> Result<String, String> {
    state
        .credentials
        .clear()
        .map_err(|e| format!("Failed to clear token: {}", e))?;
    log::info!("Session token cleared");
    Ok("Signed out".to_string())
}

// ── Rendering ────────────────────────────────────────────────────────────────

fn render_stats(stats: &Stats) -> Vec<String> {
    vec![
        format!("templates  {}", stats.template_count),
        format!("pending    {}", stats.pending_count),
        format!("sent       {}", stats.sent_count),
        format!("failed     {}", stats.failed_count),
    ]
}

fn render_templates(list: &[EmailTemplate]) -> Vec<String> {
    if list.is_empty() {
        return vec!["No templates".to_string()];
    }
    list.iter()
        .map(|t| format!("#{} {} | {}", t.id, t.name, t.subject))
        .collect()
}

fn render_tasks(list: &[EmailTask]) -> Vec<String> {
    if list.is_empty() {
        return vec!["No tasks".to_string()];
    }
    list.iter()
        .map(|t| {
            format!(
                "#{} {} [{}] {}/{} sent",
                t.id,
                t.name,
                t.status.as_str(),
                t.sent_count,
                t.total_count
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::auth::{MemoryStore, StoreKind};
    use crate::config::{ApiConfig, AppConfig};
    use crate::nav::StaticCatalog;
    use crate::notify::{ChannelNotifier, LogNotifier, Notifier};

    fn state_with(origin: &str, notifier: Arc<dyn Notifier>) -> AppState {
        let config = AppConfig {
            api: ApiConfig::new(origin),
            store: StoreKind::Memory,
            storage_path: None,
        };
        AppState::from_parts(
            &config,
            Arc::new(MemoryStore::new()),
            notifier,
            Arc::new(StaticCatalog),
        )
        .unwrap()
    }

    fn state_for(origin: &str) -> AppState {
        state_with(origin, Arc::new(LogNotifier))
    }

    #[test]
    fn test_routes_lists_menu() {
        let state = state_for("http://127.0.0.1:9");
        let out = routes(&state);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("/dashboard"));
        assert!(lines[0].contains("Overview"));
        assert!(lines[2].contains("[Upload]"));
    }

    #[test]
    fn test_login_logout() {
        let state = state_for("http://127.0.0.1:9");
        assert!(login(&state, "   ").is_err());

        login(&state, " abc123 ").unwrap();
        assert_eq!(state.credentials.read().as_deref(), Some("abc123"));

        logout(&state).unwrap();
        assert_eq!(state.credentials.read(), None);
    }

    #[tokio::test]
    async fn test_open_screen_without_data() {
        let state = state_for("http://127.0.0.1:9");
        let out = open(&state, "/preview").await.unwrap();
        assert!(out.starts_with("== Email Preview (/preview)"));

        let err = open(&state, "/nope").await.unwrap_err();
        assert!(err.contains("No route matches /nope"), "{}", err);
    }

    #[tokio::test]
    async fn test_open_root_shows_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "template_count": 4,
                    "pending_count": 1,
                    "sent_count": 120,
                    "failed_count": 3
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let out = open(&state, "/").await.unwrap();
        assert!(out.starts_with("== Overview (/dashboard) <- /"), "{}", out);
        assert!(out.contains("sent       120"));
    }

    #[tokio::test]
    async fn test_get_reports_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/templates/9"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "template not found"})),
            )
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let err = get(&state, "/templates/9", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.starts_with("GET /templates/9 failed"), "{}", err);
    }

    #[test]
    fn test_status_reflects_session() {
        let state = state_for("http://127.0.0.1:9");
        let out = status(&state).unwrap();
        assert!(out.contains("api      http://127.0.0.1:9/api/v1"), "{}", out);
        assert!(out.contains("session  signed out"));
        assert!(out.contains("home     /dashboard"));

        login(&state, "abc123").unwrap();
        assert!(status(&state).unwrap().contains("session  signed in"));
    }

    #[tokio::test]
    async fn test_interrupt_stops_slow_screen_load() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/stats"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {}}))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let (notifier, mut notices) = ChannelNotifier::new();
        let state = state_with(&server.uri(), Arc::new(notifier));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = until_cancelled(&cancel, open(&state, "/dashboard"))
            .await
            .unwrap_err();
        assert_eq!(err, "Request cancelled");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(notices.try_recv().is_err(), "no notification on interrupt");
    }

    #[tokio::test]
    async fn test_uninterrupted_command_passes_through() {
        let state = state_for("http://127.0.0.1:9");
        let cancel = CancellationToken::new();
        let out = until_cancelled(&cancel, open(&state, "/preview")).await.unwrap();
        assert!(out.starts_with("== Email Preview"));
    }
}
