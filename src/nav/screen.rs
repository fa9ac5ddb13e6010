//! Screens and the loaders that produce them.
//!
//! The router never looks inside a screen: it only runs a route's loader the
//! first time the route is navigated to and hands back the cached result.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A renderable unit provided by the hosting shell.
pub trait Screen: Send + Sync + fmt::Debug {
    /// Component name the screen was loaded for.
    fn component(&self) -> &str;
}

/// Outcome of a loader: the screen, or a reason it could not be produced.
pub type LoadResult = Result<Arc<dyn Screen>, String>;

pub type LoadFuture = Pin<Box<dyn Future<Output = LoadResult> + Send + 'static>>;

/// Asynchronous screen factory attached to a route.
#[derive(Clone)]
pub struct ScreenLoader {
    load: Arc<dyn Fn() -> LoadFuture + Send + Sync>,
}

impl ScreenLoader {
    /// Wrap a function that already returns a boxed future.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> LoadFuture + Send + Sync + 'static,
    {
        Self { load: Arc::new(f) }
    }

    /// Wrap an async closure.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        Self::new(move || -> LoadFuture { Box::pin(f()) })
    }

    pub fn load(&self) -> LoadFuture {
        (self.load)()
    }
}

impl fmt::Debug for ScreenLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScreenLoader")
    }
}

/// Source of screens by component name, supplied by the shell when the
/// route tree is built.
pub trait ScreenCatalog: Send + Sync {
    fn load(&self, component: &'static str) -> LoadFuture;
}

/// Loader for `component` backed by `catalog`.
pub fn catalog_loader(catalog: &Arc<dyn ScreenCatalog>, component: &'static str) -> ScreenLoader {
    let catalog = Arc::clone(catalog);
    ScreenLoader::new(move || catalog.load(component))
}

/// A screen that is nothing but its component name. Used by shells that
/// render from the route metadata alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticScreen {
    component: String,
}

impl StaticScreen {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
        }
    }
}

impl Screen for StaticScreen {
    fn component(&self) -> &str {
        &self.component
    }
}

/// Catalog that hands out a fresh [`StaticScreen`] per load.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCatalog;

impl ScreenCatalog for StaticCatalog {
    fn load(&self, component: &'static str) -> LoadFuture {
        Box::pin(async move {
            let screen: Arc<dyn Screen> = Arc::new(StaticScreen::new(component));
            Ok(screen)
        })
    }
}
