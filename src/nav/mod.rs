//! Navigation tree resolver.
//!
//! Maps locations to routes declared in a [`RouteNode`] tree, follows the
//! default redirect, and loads each route's screen lazily: the first
//! navigation runs the loader, concurrent navigations to the same route wait
//! for that one load, and later navigations reuse the cached screen.

pub mod route;
pub mod routes;
pub mod screen;

pub use route::{join_path, normalize_path, RouteMeta, RouteNode};
pub use routes::{dashboard_router, dashboard_routes, DEFAULT_ROUTE};
pub use screen::{
    catalog_loader, LoadFuture, LoadResult, Screen, ScreenCatalog, ScreenLoader, StaticCatalog,
    StaticScreen,
};

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;

/// Redirect chains longer than this are treated as loops.
pub const MAX_REDIRECTS: usize = 8;

/// Index of a route in its router.
pub type RecordId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("No route matches {0}")]
    NotFound(String),

    #[error("Route name {0:?} is declared more than once")]
    DuplicateName(String),

    #[error("Route path {0} is declared more than once")]
    DuplicatePath(String),

    #[error("No top-level route at / defines the default redirect")]
    MissingDefault,

    #[error("{0} top-level routes at / define a redirect; exactly one is allowed")]
    AmbiguousDefault(usize),

    #[error("Redirect {from} -> {to} is invalid: {reason}")]
    InvalidRedirect {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Too many redirects resolving {0}")]
    RedirectLoop(String),

    #[error("Route {0} has no screen")]
    NoScreen(String),

    #[error("Failed to load screen for {route}: {reason}")]
    LoadFailed { route: String, reason: String },
}

/// Flattened route with its full path and screen cache.
struct RouteRecord {
    full_path: String,
    segments: Vec<String>,
    name: Option<String>,
    meta: RouteMeta,
    redirect: Option<String>,
    loader: Option<ScreenLoader>,
    children: Vec<RecordId>,
    screen: OnceCell<Arc<dyn Screen>>,
}

impl RouteRecord {
    /// Name if the route has one, otherwise its path.
    fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.full_path.clone())
    }
}

/// Result of resolving a location. Carries everything the shell needs to
/// label the page; the screen itself is loaded separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    /// Normalized path of the matched route (after redirects).
    pub path: String,
    pub name: Option<String>,
    /// Metadata merged from the outermost route down to the leaf.
    pub meta: RouteMeta,
    /// Matched chain, outermost first. The last entry is the leaf.
    pub matched: Vec<RecordId>,
    /// Location originally asked for, when a redirect was followed.
    pub redirected_from: Option<String>,
    breadcrumbs: Vec<String>,
}

impl ResolvedRoute {
    pub fn leaf(&self) -> Option<RecordId> {
        self.matched.last().copied()
    }

    pub fn title(&self) -> Option<&str> {
        self.meta.title.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.meta.icon.as_deref()
    }

    /// Titles along the matched chain, outermost first.
    pub fn breadcrumbs(&self) -> &[String] {
        &self.breadcrumbs
    }
}

/// A completed navigation: the route plus the screens of its matched chain
/// (layouts first, leaf last). Routes without a loader contribute nothing.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub route: ResolvedRoute,
    pub screens: Vec<Arc<dyn Screen>>,
}

impl Navigation {
    /// The leaf route's screen.
    pub fn screen(&self) -> Option<&Arc<dyn Screen>> {
        self.screens.last()
    }
}

/// Sidebar entry for a named route directly under the default layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub name: String,
    pub path: String,
    pub title: String,
    pub icon: Option<String>,
}

/// Compiled, immutable route table.
pub struct Router {
    records: Vec<RouteRecord>,
    roots: Vec<RecordId>,
    default: RecordId,
    names: HashMap<String, RecordId>,
}

impl Router {
    /// Compile and validate a route tree.
    pub fn new(routes: Vec<RouteNode>) -> Result<Self, RouteError> {
        let mut records = Vec::new();
        let mut roots = Vec::with_capacity(routes.len());
        for node in routes {
            roots.push(flatten(&mut records, node, "/"));
        }

        let mut names = HashMap::new();
        let mut leaf_paths = HashMap::new();
        for (id, record) in records.iter().enumerate() {
            if let Some(ref name) = record.name {
                if names.insert(name.clone(), id).is_some() {
                    return Err(RouteError::DuplicateName(name.clone()));
                }
            }
            if record.children.is_empty()
                && leaf_paths.insert(record.full_path.clone(), id).is_some()
            {
                return Err(RouteError::DuplicatePath(record.full_path.clone()));
            }
        }

        let defaults: Vec<RecordId> = roots
            .iter()
            .copied()
            .filter(|&id| records[id].full_path == "/" && records[id].redirect.is_some())
            .collect();
        let default = match defaults.as_slice() {
            [] => return Err(RouteError::MissingDefault),
            [only] => *only,
            many => return Err(RouteError::AmbiguousDefault(many.len())),
        };

        let router = Self {
            records,
            roots,
            default,
            names,
        };
        router.check_redirects()?;

        log::debug!(
            "Route table compiled: {} routes, {} named",
            router.records.len(),
            router.names.len()
        );
        Ok(router)
    }

    /// Every redirect must land on a real, non-redirecting route.
    fn check_redirects(&self) -> Result<(), RouteError> {
        for record in &self.records {
            if let Some(ref target) = record.redirect {
                self.resolve(target)
                    .map_err(|e| RouteError::InvalidRedirect {
                        from: record.full_path.clone(),
                        to: target.clone(),
                        reason: e.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// Resolve a location to a route, following redirects. Never loads
    /// screens.
    pub fn resolve(&self, location: &str) -> Result<ResolvedRoute, RouteError> {
        let requested = normalize_path(location);
        let mut current = requested.clone();
        let mut redirected_from = None;

        for _ in 0..=MAX_REDIRECTS {
            let wanted = route::segments(&current);
            let chain = self
                .roots
                .iter()
                .find_map(|&root| self.match_chain(root, &wanted))
                .ok_or_else(|| RouteError::NotFound(current.clone()))?;
            let leaf = chain
                .last()
                .copied()
                .ok_or_else(|| RouteError::NotFound(current.clone()))?;

            match self.records[leaf].redirect {
                Some(ref target) => {
                    log::debug!("Redirecting {} -> {}", current, target);
                    redirected_from.get_or_insert_with(|| requested.clone());
                    current = target.clone();
                }
                None => return Ok(self.resolved(chain, current, redirected_from)),
            }
        }

        Err(RouteError::RedirectLoop(requested))
    }

    /// Deepest chain under `id` matching `wanted`, children in declaration
    /// order before the node itself.
    fn match_chain(&self, id: RecordId, wanted: &[String]) -> Option<Vec<RecordId>> {
        let record = &self.records[id];
        for &child in &record.children {
            if let Some(mut chain) = self.match_chain(child, wanted) {
                chain.insert(0, id);
                return Some(chain);
            }
        }
        if record.segments == wanted {
            Some(vec![id])
        } else {
            None
        }
    }

    fn resolved(
        &self,
        matched: Vec<RecordId>,
        path: String,
        redirected_from: Option<String>,
    ) -> ResolvedRoute {
        let meta = matched
            .iter()
            .fold(RouteMeta::default(), |acc, &id| acc.merged_with(&self.records[id].meta));
        let breadcrumbs = matched
            .iter()
            .filter_map(|&id| self.records[id].meta.title.clone())
            .collect();
        let name = matched.last().and_then(|&id| self.records[id].name.clone());
        ResolvedRoute {
            path,
            name,
            meta,
            matched,
            redirected_from,
            breadcrumbs,
        }
    }

    /// Load (or reuse) the leaf screen of `route`.
    pub async fn load(&self, route: &ResolvedRoute) -> Result<Arc<dyn Screen>, RouteError> {
        let leaf = route
            .leaf()
            .ok_or_else(|| RouteError::NotFound(route.path.clone()))?;
        self.load_record(leaf).await
    }

    /// Resolve `location` and load every screen along the matched chain.
    pub async fn navigate(&self, location: &str) -> Result<Navigation, RouteError> {
        let route = self.resolve(location)?;
        let leaf = route.leaf();
        let mut screens = Vec::with_capacity(route.matched.len());
        for &id in &route.matched {
            // Layouts without a screen are skipped; the leaf must have one.
            if Some(id) != leaf && self.records[id].loader.is_none() {
                continue;
            }
            screens.push(self.load_record(id).await?);
        }
        log::info!(
            "Navigated to {} ({})",
            route.path,
            route.title().unwrap_or("untitled")
        );
        Ok(Navigation { route, screens })
    }

    /// Whether the leaf screen of `route` has been instantiated.
    pub fn is_loaded(&self, route: &ResolvedRoute) -> bool {
        route
            .leaf()
            .and_then(|id| self.records.get(id))
            .map(|record| record.screen.initialized())
            .unwrap_or(false)
    }

    async fn load_record(&self, id: RecordId) -> Result<Arc<dyn Screen>, RouteError> {
        let record = self
            .records
            .get(id)
            .ok_or_else(|| RouteError::NotFound(format!("#{}", id)))?;
        let loader = record
            .loader
            .as_ref()
            .ok_or_else(|| RouteError::NoScreen(record.label()))?;

        let screen = record
            .screen
            .get_or_try_init(|| async {
                log::debug!("Loading screen for {}", record.full_path);
                loader.load().await.map_err(|reason| {
                    log::warn!("Screen load failed for {}: {}", record.full_path, reason);
                    RouteError::LoadFailed {
                        route: record.label(),
                        reason,
                    }
                })
            })
            .await?;
        Ok(Arc::clone(screen))
    }

    /// Full path of the route called `name`.
    pub fn path_of(&self, name: &str) -> Result<&str, RouteError> {
        self.names
            .get(name)
            .map(|&id| self.records[id].full_path.as_str())
            .ok_or_else(|| RouteError::NotFound(name.to_string()))
    }

    /// Named, titled routes directly under the default layout, in
    /// declaration order.
    pub fn menu(&self) -> Vec<MenuEntry> {
        self.records[self.default]
            .children
            .iter()
            .filter_map(|&id| {
                let record = &self.records[id];
                Some(MenuEntry {
                    name: record.name.clone()?,
                    path: record.full_path.clone(),
                    title: record.meta.title.clone()?,
                    icon: record.meta.icon.clone(),
                })
            })
            .collect()
    }

    /// Where the document root ends up.
    pub fn default_path(&self) -> Result<String, RouteError> {
        self.resolve("/").map(|route| route.path)
    }
}

/// Append `node` and its descendants to `records`, returning the node's id.
fn flatten(records: &mut Vec<RouteRecord>, node: RouteNode, parent_path: &str) -> RecordId {
    let full_path = join_path(parent_path, &node.path);
    let redirect = node
        .redirect
        .as_deref()
        .map(|target| join_path(&full_path, target));

    let id = records.len();
    records.push(RouteRecord {
        segments: route::segments(&full_path),
        full_path: full_path.clone(),
        name: node.name,
        meta: node.meta,
        redirect,
        loader: node.loader,
        children: Vec::new(),
        screen: OnceCell::new(),
    });

    let children: Vec<RecordId> = node
        .children
        .into_iter()
        .map(|child| flatten(records, child, &full_path))
        .collect();
    records[id].children = children;
    id
}
