use alloc::{boxed::Box, sync::Arc, vec::Vec};

use super::{finish_transient, resolve_cached, ResolutionStrategy, Resolver};
use crate::{
    any::AnyService,
    call_site::{Args, CallSite, CallSiteKind, CtorFn, FactoryFn},
    dispose::DisposalHooks,
    errors::ResolveErrorKind,
    lifetime::{CacheKey, CacheLocation},
    scope::Scope,
};

/// Compiles each call-site tree once into a reusable resolver closure.
///
/// The tree is lowered into an intermediate representation and materialized
/// bottom-up into nested function values; at call time no call-site is
/// inspected. One-time build cost per distinct call-site, amortized across
/// repeated resolutions by the provider's realized-resolver cache.
pub struct SpecializingStrategy;

impl ResolutionStrategy for SpecializingStrategy {
    fn realize(&self, site: &Arc<CallSite>) -> Resolver {
        materialize(lower(site))
    }
}

/// Lowered form of one call-site: the cache and capture decisions are made
/// here, once, so materialized closures carry no policy branches.
enum Ir {
    Constant(AnyService),
    Provider,
    Construct {
        ctor: CtorFn,
        deps: Vec<Ir>,
    },
    Factory {
        factory: FactoryFn,
    },
    Collect {
        items: Vec<Ir>,
    },
    Capture {
        hooks: DisposalHooks,
        inner: Box<Ir>,
    },
    Cached {
        location: CacheLocation,
        key: CacheKey,
        hooks: Option<DisposalHooks>,
        inner: Box<Ir>,
    },
}

fn lower(site: &Arc<CallSite>) -> Ir {
    let body = match site.kind() {
        CallSiteKind::Constructor { ctor, params } => Ir::Construct {
            ctor: ctor.clone(),
            deps: params.iter().map(lower).collect(),
        },
        CallSiteKind::Factory { factory } => Ir::Factory {
            factory: factory.clone(),
        },
        CallSiteKind::Enumerable { items } => Ir::Collect {
            items: items.iter().map(lower).collect(),
        },
        CallSiteKind::Provider => Ir::Provider,
        CallSiteKind::Constant { value } => Ir::Constant(value.clone()),
    };

    let cache = site.cache();
    match cache.location {
        CacheLocation::None => match site.disposal() {
            Some(hooks) => Ir::Capture {
                hooks: hooks.clone(),
                inner: Box::new(body),
            },
            None => body,
        },
        location => Ir::Cached {
            location,
            key: cache.key,
            hooks: site.disposal().cloned(),
            inner: Box::new(body),
        },
    }
}

fn materialize(ir: Ir) -> Resolver {
    match ir {
        Ir::Constant(value) => Arc::new(move |_: &Scope| Ok(value.clone())),
        Ir::Provider => Arc::new(|scope: &Scope| Ok(scope.as_service())),
        Ir::Construct { ctor, deps } => {
            let deps: Vec<Resolver> = deps.into_iter().map(materialize).collect();
            Arc::new(move |scope: &Scope| {
                let mut resolved = Vec::with_capacity(deps.len());
                for dep in &deps {
                    resolved.push((**dep)(scope)?);
                }
                (*ctor)(Args::new(&resolved)).map_err(ResolveErrorKind::Construction)
            })
        }
        Ir::Factory { factory } => {
            Arc::new(move |scope: &Scope| (*factory)(scope).map_err(ResolveErrorKind::Construction))
        }
        Ir::Collect { items } => {
            let items: Vec<Resolver> = items.into_iter().map(materialize).collect();
            Arc::new(move |scope: &Scope| {
                let mut collected = Vec::with_capacity(items.len());
                for item in &items {
                    collected.push((**item)(scope)?);
                }
                Ok(Arc::new(collected) as AnyService)
            })
        }
        Ir::Capture { hooks, inner } => {
            let inner = materialize(*inner);
            Arc::new(move |scope: &Scope| {
                let instance = (*inner)(scope)?;
                finish_transient(scope, instance, Some(&hooks))
            })
        }
        Ir::Cached {
            location,
            key,
            hooks,
            inner,
        } => {
            let inner = materialize(*inner);
            Arc::new(move |scope: &Scope| {
                resolve_cached(scope, location, &key, hooks.as_ref(), &|scope| (*inner)(scope))
            })
        }
    }
}
