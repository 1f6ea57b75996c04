//! Build-wide services shared by every template.

use crate::cache::{ExistenceCache, StatCache};
use crate::config::{Hooks, SiteConfig};
use crate::data::{DataStore, FsDataStore};
use crate::engine::EngineRegistry;
use crate::template::{ChunkPaginator, LayoutCache, Paginator};
use std::fmt;
use std::sync::Arc;

/// Configuration plus the collaborators a build talks to.
///
/// Built once per build and shared as `Arc<SiteContext>`.
pub struct SiteContext {
    pub config: SiteConfig,
    pub hooks: Hooks,
    pub engines: EngineRegistry,
    pub data_store: Arc<dyn DataStore>,
    pub paginator: Arc<dyn Paginator>,
    pub layouts: LayoutCache,
    pub existence: ExistenceCache,
    pub stats: StatCache,
}

impl SiteContext {
    /// Filesystem data store, built-in engines and chunk pagination.
    pub fn new(config: SiteConfig) -> Self {
        let data_store = Arc::new(FsDataStore::new(&config));
        Self {
            config,
            hooks: Hooks::new(),
            engines: EngineRegistry::with_defaults(),
            data_store,
            paginator: Arc::new(ChunkPaginator),
            layouts: LayoutCache::new(),
            existence: ExistenceCache::new(),
            stats: StatCache::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_engines(mut self, engines: EngineRegistry) -> Self {
        self.engines = engines;
        self
    }

    pub fn with_data_store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.data_store = store;
        self
    }

    pub fn with_paginator(mut self, paginator: Arc<dyn Paginator>) -> Self {
        self.paginator = paginator;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for SiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteContext")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .field("engines", &self.engines)
            .finish_non_exhaustive()
    }
}
