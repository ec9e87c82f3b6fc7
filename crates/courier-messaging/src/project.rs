//! Project id resolution.
//!
//! The send endpoint path embeds a project id obtained from one of these
//! resolvers. The dispatcher asks once and caches the answer.

use std::sync::Arc;

use async_trait::async_trait;

/// Supplies the project id, or `None` when it cannot be determined.
#[async_trait]
pub trait ProjectIdResolver: Send + Sync {
    /// Resolve the project id.
    async fn project_id(&self) -> Option<String>;
}

/// A project id known up front.
#[derive(Clone, Debug)]
pub struct StaticProjectId(pub String);

#[async_trait]
impl ProjectIdResolver for StaticProjectId {
    async fn project_id(&self) -> Option<String> {
        Some(self.0.clone()).filter(|id| !id.is_empty())
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Project id from `GOOGLE_CLOUD_PROJECT`, then `GCLOUD_PROJECT`.
pub struct EnvProjectId {
    lookup: EnvLookup,
}

/// Variables consulted by [`EnvProjectId`], in order.
pub const PROJECT_ID_VARS: [&str; 2] = ["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

impl EnvProjectId {
    /// Read the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Read through `lookup` instead of the process environment.
    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }
}

impl Default for EnvProjectId {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectIdResolver for EnvProjectId {
    async fn project_id(&self) -> Option<String> {
        PROJECT_ID_VARS
            .iter()
            .find_map(|name| (self.lookup)(name).filter(|v| !v.is_empty()))
    }
}

/// Tries each resolver in order and returns the first answer.
#[derive(Default)]
pub struct ProjectIdChain {
    resolvers: Vec<Arc<dyn ProjectIdResolver>>,
}

impl ProjectIdChain {
    /// Empty chain; resolves to `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver.
    #[must_use]
    pub fn with(mut self, resolver: Arc<dyn ProjectIdResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }
}

#[async_trait]
impl ProjectIdResolver for ProjectIdChain {
    async fn project_id(&self) -> Option<String> {
        for resolver in &self.resolvers {
            if let Some(id) = resolver.project_id().await {
                return Some(id);
            }
        }
        None
    }
}
