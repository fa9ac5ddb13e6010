//! The dashboard's route table.
//!
//! One layout at `/` holding the five screens; the document root redirects
//! to the overview.

use std::sync::Arc;

use super::route::{RouteMeta, RouteNode};
use super::screen::{catalog_loader, ScreenCatalog};
use super::{RouteError, Router};

/// Where `/` lands.
pub const DEFAULT_ROUTE: &str = "/dashboard";

/// Build the route tree, taking every screen from `catalog`.
pub fn dashboard_routes(catalog: Arc<dyn ScreenCatalog>) -> Vec<RouteNode> {
    let page = |path: &str, name: &'static str, title: &str, icon: &str| {
        RouteNode::new(path)
            .named(name)
            .with_loader(catalog_loader(&catalog, name))
            .with_meta(RouteMeta::new(title, icon))
    };

    vec![RouteNode::new("/")
        .with_loader(catalog_loader(&catalog, "Layout"))
        .redirect_to(DEFAULT_ROUTE)
        .children([
            page("dashboard", "Dashboard", "Overview", "DataAnalysis"),
            page("templates", "Templates", "Templates", "Document"),
            page("data-import", "DataImport", "Data Import", "Upload"),
            page("tasks", "Tasks", "Send Tasks", "Message"),
            page("preview", "Preview", "Email Preview", "View"),
        ])]
}

/// Compile [`dashboard_routes`].
pub fn dashboard_router(catalog: Arc<dyn ScreenCatalog>) -> Result<Router, RouteError> {
    Router::new(dashboard_routes(catalog))
}
