//! Route tree declaration.
//!
//! A route tree is an immutable nested value built once at startup, e.g.
//!
//! ```ignore
//! RouteNode::new("/")
//!     .redirect_to("/dashboard")
//!     .child(RouteNode::new("dashboard").named("Dashboard"))
//! ```
//!
//! Child paths without a leading `/` are relative to their parent.

use super::screen::ScreenLoader;

/// Display metadata read by the shell (menu entries, window title,
/// breadcrumbs) without instantiating the screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub title: Option<String>,
    pub icon: Option<String>,
}

impl RouteMeta {
    pub fn new(title: &str, icon: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            icon: Some(icon.to_string()),
        }
    }

    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            icon: None,
        }
    }

    /// `self` overridden field-by-field by whatever `child` sets.
    pub fn merged_with(&self, child: &RouteMeta) -> RouteMeta {
        RouteMeta {
            title: child.title.clone().or_else(|| self.title.clone()),
            icon: child.icon.clone().or_else(|| self.icon.clone()),
        }
    }
}

/// One node of the navigation tree.
#[derive(Debug, Clone)]
pub struct RouteNode {
    pub(crate) path: String,
    pub(crate) name: Option<String>,
    pub(crate) loader: Option<ScreenLoader>,
    pub(crate) meta: RouteMeta,
    pub(crate) redirect: Option<String>,
    pub(crate) children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: None,
            loader: None,
            meta: RouteMeta::default(),
            redirect: None,
            children: Vec::new(),
        }
    }

    /// Unique route name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_loader(mut self, loader: ScreenLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Send exact matches of this node to `target` (absolute, or relative to
    /// this node's own path).
    pub fn redirect_to(mut self, target: &str) -> Self {
        self.redirect = Some(target.to_string());
        self
    }

    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = RouteNode>,
    {
        self.children.extend(children);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn meta(&self) -> &RouteMeta {
        &self.meta
    }
}

/// Canonical form of a location: leading `/`, no empty segments, no trailing
/// slash, query and fragment dropped. The root is `/`.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    let segments: Vec<&str> = path[..end].split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Full path of a child declared as `child` under a parent at `parent`.
pub fn join_path(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        normalize_path(child)
    } else {
        normalize_path(&format!("{}/{}", parent, child))
    }
}

/// Path segments of a normalized path; the root has none.
pub(crate) fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("//"), "/");
        assert_eq!(normalize_path("dashboard"), "/dashboard");
        assert_eq!(normalize_path("/tasks/"), "/tasks");
        assert_eq!(normalize_path("/a//b/"), "/a/b");
        assert_eq!(normalize_path("/tasks?page=2"), "/tasks");
        assert_eq!(normalize_path("/preview#top"), "/preview");
        assert_eq!(normalize_path("/?x=1"), "/");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "dashboard"), "/dashboard");
        assert_eq!(join_path("/admin", "users"), "/admin/users");
        assert_eq!(join_path("/admin", "/settings"), "/settings");
        assert_eq!(join_path("/admin", ""), "/admin");
        assert_eq!(join_path("/", ""), "/");
    }

    #[test]
    fn test_meta_merge_child_wins() {
        let parent = RouteMeta::new("Console", "Home");
        let child = RouteMeta::titled("Tasks");
        let merged = parent.merged_with(&child);
        assert_eq!(merged.title.as_deref(), Some("Tasks"));
        assert_eq!(merged.icon.as_deref(), Some("Home"));

        let merged = parent.merged_with(&RouteMeta::default());
        assert_eq!(merged, parent);
    }

    #[test]
    fn test_builder() {
        let node = RouteNode::new("/")
            .redirect_to("/dashboard")
            .child(RouteNode::new("dashboard").named("Dashboard"))
            .children([RouteNode::new("tasks").named("Tasks")]);
        assert_eq!(node.path(), "/");
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[1].name(), Some("Tasks"));
        assert_eq!(node.redirect.as_deref(), Some("/dashboard"));
    }
}
