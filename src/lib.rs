#![no_std]

extern crate alloc;

pub(crate) mod any;
pub(crate) mod call_site;
pub(crate) mod dispose;
pub(crate) mod errors;
pub(crate) mod lifetime;
pub(crate) mod observe;
pub(crate) mod provider;
pub(crate) mod registry;
pub(crate) mod scope;
pub(crate) mod strategy;

pub use any::{AnyService, ServiceKey, TypeInfo};
pub use call_site::{Args, CallSite, CallSiteKind, CtorFn, FactoryFn};
pub use dispose::{AsyncDispose, Dispose};
pub use errors::{DisposeErrorKind, ResolveErrorKind};
pub use lifetime::{CacheInfo, CacheKey, CacheLocation, Lifetime};
pub use observe::{TeardownObserver, TeardownReport};
pub use provider::{ProviderConfig, ServiceProvider, StrategyKind};
pub use registry::CallSiteRegistry;
pub use scope::Scope;
pub use strategy::{InterpretingStrategy, ResolutionStrategy, Resolver, SpecializingStrategy};
