use alloc::{boxed::Box, collections::BTreeMap, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use parking_lot::Mutex;

use crate::{
    any::ServiceKey,
    call_site::CallSite,
    errors::{DisposeErrorKind, ResolveErrorKind},
    observe::TeardownObserver,
    registry::CallSiteRegistry,
    scope::Scope,
    strategy::{InterpretingStrategy, ResolutionStrategy, Resolver, SpecializingStrategy},
};

/// How call-sites are turned into executable resolvers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrategyKind {
    /// Walk the call-site tree on every resolution. No warm-up cost.
    Interpret,
    /// Compile each call-site once into a reusable closure, trading a
    /// one-time build cost for repeated-call speed.
    #[default]
    Specialize,
}

impl StrategyKind {
    fn build(self) -> Box<dyn ResolutionStrategy> {
        match self {
            StrategyKind::Interpret => Box::new(InterpretingStrategy),
            StrategyKind::Specialize => Box::new(SpecializingStrategy),
        }
    }
}

/// Config for a provider
/// ## Fields
/// - `strategy`:
///   The resolution strategy realizing call-sites into resolvers. Both
///   strategies are observably identical; `Specialize` amortizes the
///   tree-walk for services resolved many times.
/// - `observer`:
///   Teardown observability hook, invoked once per closed scope.
#[derive(Clone)]
pub struct ProviderConfig {
    pub strategy: StrategyKind,
    pub observer: Option<Arc<dyn TeardownObserver>>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            observer: None,
        }
    }
}

pub(crate) struct ProviderShared {
    pub(crate) registry: CallSiteRegistry,
    strategy: Box<dyn ResolutionStrategy>,
    /// Realized resolvers, one per registered call-site, kept for the
    /// container's lifetime.
    realized: Mutex<BTreeMap<ServiceKey, Resolver>>,
    pub(crate) observer: Option<Arc<dyn TeardownObserver>>,
    pub(crate) disposed: AtomicBool,
    next_scope_id: AtomicU64,
}

impl ProviderShared {
    pub(crate) fn realized(&self, site: &Arc<CallSite>) -> Resolver {
        let mut realized = self.realized.lock();
        if let Some(resolver) = realized.get(&site.key()) {
            return resolver.clone();
        }
        let resolver = self.strategy.realize(site);
        realized.insert(site.key(), resolver.clone());
        resolver
    }

    pub(crate) fn next_scope_id(&self) -> u64 {
        self.next_scope_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// The container: one immutable registration set, one root scope, one
/// resolution strategy.
///
/// Cheap to clone; clones share the container. Resolutions through the
/// provider itself use the root scope, so scoped registrations resolved here
/// live for the container's lifetime. Open a child scope with
/// [`Self::create_scope`] for shorter-lived resolution sessions.
///
/// The provider and its root scope are two views of one lifetime: closing
/// either closes the other, exactly once.
#[derive(Clone)]
pub struct ServiceProvider {
    shared: Arc<ProviderShared>,
    root: Scope,
}

impl ServiceProvider {
    #[inline]
    #[must_use]
    pub fn new(registry: CallSiteRegistry) -> Self {
        Self::with_config(registry, ProviderConfig::default())
    }

    #[must_use]
    pub fn with_config(registry: CallSiteRegistry, config: ProviderConfig) -> Self {
        let shared = Arc::new(ProviderShared {
            registry,
            strategy: config.strategy.build(),
            realized: Mutex::new(BTreeMap::new()),
            observer: config.observer,
            disposed: AtomicBool::new(false),
            next_scope_id: AtomicU64::new(1),
        });
        let root = Scope::root(shared.clone());
        Self { shared, root }
    }

    #[inline]
    #[must_use]
    pub fn root_scope(&self) -> &Scope {
        &self.root
    }

    /// Opens a child scope with its own resolved-instance cache and disposal
    /// list. The caller owns its lifetime; close it (or drop it) to tear its
    /// instances down.
    #[must_use]
    pub fn create_scope(&self) -> Scope {
        Scope::child(self.shared.clone(), self.root.clone())
    }

    /// Gets a service from the root scope, or `None` when the identity has no
    /// registration.
    #[allow(clippy::missing_errors_doc)]
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        self.root.get::<T>()
    }

    /// Gets a service from the root scope, failing when it has no
    /// registration.
    #[allow(clippy::missing_errors_doc)]
    pub fn get_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.root.get_required::<T>()
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn get_keyed<T: Send + Sync + 'static>(&self, name: &'static str) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        self.root.get_keyed::<T>(name)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn get_required_keyed<T: Send + Sync + 'static>(&self, name: &'static str) -> Result<Arc<T>, ResolveErrorKind> {
        self.root.get_required_keyed::<T>(name)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn get_all<T: Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        self.root.get_all::<T>()
    }

    /// Count of root registrations, for diagnostics.
    #[inline]
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Closes the container by closing its root scope.
    ///
    /// # Errors
    /// Returns [`DisposeErrorKind::SyncDisposalUnsupported`] when a captured
    /// entry exposes only an asynchronous disposal path.
    pub fn close(&self) -> Result<(), DisposeErrorKind> {
        self.root.close()
    }

    /// Closes the container by closing its root scope, preferring each
    /// entry's asynchronous disposal path.
    pub async fn close_async(&self) {
        self.root.close_async().await;
    }
}
