//! Shared application state handed to every handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::UnitOfWork;

/// Cheap to clone; all clones share the same store.
pub struct AppState<U> {
    inner: Arc<StateInner<U>>,
}

struct StateInner<U> {
    store: U,
    static_dir: PathBuf,
    admin_page: PathBuf,
}

// Derived Clone would require `U: Clone`.
impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U: UnitOfWork> AppState<U> {
    pub fn new(store: U, static_dir: impl Into<PathBuf>, admin_page: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StateInner {
                store,
                static_dir: static_dir.into(),
                admin_page: admin_page.into(),
            }),
        }
    }

    pub fn store(&self) -> &U {
        &self.inner.store
    }

    pub fn static_dir(&self) -> &Path {
        &self.inner.static_dir
    }

    pub fn admin_page(&self) -> &Path {
        &self.inner.admin_page
    }
}
