mod interpret;
mod specialize;

pub use interpret::InterpretingStrategy;
pub use specialize::SpecializingStrategy;

use alloc::sync::Arc;
use tracing::debug;

use crate::{
    any::AnyService,
    call_site::CallSite,
    dispose::DisposalHooks,
    errors::ResolveErrorKind,
    lifetime::{CacheKey, CacheLocation},
    scope::Scope,
};

/// An executable resolver produced from one call-site: a pure function of the
/// requesting scope.
pub type Resolver = Arc<dyn Fn(&Scope) -> Result<AnyService, ResolveErrorKind> + Send + Sync>;

/// A mechanism converting call-sites into executable resolvers.
///
/// The two implementations are interchangeable and behaviorally identical:
/// [`InterpretingStrategy`] walks the tree on every call,
/// [`SpecializingStrategy`] compiles the tree once into a reusable closure.
/// The provider realizes each registered call-site at most once and keeps the
/// resolver for the container's lifetime.
pub trait ResolutionStrategy: Send + Sync {
    fn realize(&self, site: &Arc<CallSite>) -> Resolver;
}

/// Cache-then-construct step shared by both strategies, so their caching,
/// disposal registration and failures cannot drift apart.
///
/// Dependencies of a root-cached service are resolved against the root scope,
/// never the requesting one: a container-lifetime instance must not hold a
/// shorter-lived dependency. The guard is released during construction; the
/// first caller to re-acquire it and insert wins, later callers keep the
/// cached instance and discard their own.
pub(crate) fn resolve_cached(
    scope: &Scope,
    location: CacheLocation,
    key: &CacheKey,
    hooks: Option<&DisposalHooks>,
    construct: &dyn Fn(&Scope) -> Result<AnyService, ResolveErrorKind>,
) -> Result<AnyService, ResolveErrorKind> {
    let target = match location {
        CacheLocation::Scope => scope,
        CacheLocation::Root => scope.root_handle(),
        CacheLocation::None => return construct(scope),
    };

    if let Some(cached) = target.cached(key) {
        debug!("Found in cache");
        return Ok(cached);
    }
    debug!("Not found in cache");

    let instance = construct(target)?;
    let disposer = hooks.map(|hooks| hooks.bind(&instance));
    target.insert_or_existing(*key, instance, disposer)
}

/// Post-construction step for uncached sites: instances with a disposal
/// capability are captured by the requesting scope before being returned.
pub(crate) fn finish_transient(
    scope: &Scope,
    instance: AnyService,
    hooks: Option<&DisposalHooks>,
) -> Result<AnyService, ResolveErrorKind> {
    if let Some(hooks) = hooks {
        scope.capture(hooks.bind(&instance))?;
    }
    Ok(instance)
}
