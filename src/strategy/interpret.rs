use alloc::{sync::Arc, vec::Vec};

use super::{finish_transient, resolve_cached, ResolutionStrategy, Resolver};
use crate::{
    any::AnyService,
    call_site::{Args, CallSite, CallSiteKind},
    errors::ResolveErrorKind,
    lifetime::CacheLocation,
    scope::Scope,
};

/// Resolves by walking the call-site tree recursively on every invocation.
///
/// Has no warm-up cost and repeats the tree-walking overhead on every call;
/// the baseline the specializing strategy must match observably.
pub struct InterpretingStrategy;

impl ResolutionStrategy for InterpretingStrategy {
    fn realize(&self, site: &Arc<CallSite>) -> Resolver {
        let site = site.clone();
        Arc::new(move |scope: &Scope| resolve_site(&site, scope))
    }
}

fn resolve_site(site: &Arc<CallSite>, scope: &Scope) -> Result<AnyService, ResolveErrorKind> {
    let cache = site.cache();
    match cache.location {
        CacheLocation::None => {
            let instance = resolve_kind(site, scope)?;
            finish_transient(scope, instance, site.disposal())
        }
        location => resolve_cached(scope, location, &cache.key, site.disposal(), &|scope| {
            resolve_kind(site, scope)
        }),
    }
}

fn resolve_kind(site: &Arc<CallSite>, scope: &Scope) -> Result<AnyService, ResolveErrorKind> {
    match site.kind() {
        CallSiteKind::Constructor { ctor, params } => {
            let mut deps = Vec::with_capacity(params.len());
            for param in params {
                deps.push(resolve_site(param, scope)?);
            }
            (**ctor)(Args::new(&deps)).map_err(ResolveErrorKind::Construction)
        }
        CallSiteKind::Factory { factory } => (**factory)(scope).map_err(ResolveErrorKind::Construction),
        CallSiteKind::Enumerable { items } => {
            let mut collected = Vec::with_capacity(items.len());
            for item in items {
                collected.push(resolve_site(item, scope)?);
            }
            Ok(Arc::new(collected) as AnyService)
        }
        CallSiteKind::Provider => Ok(scope.as_service()),
        CallSiteKind::Constant { value } => Ok(value.clone()),
    }
}
