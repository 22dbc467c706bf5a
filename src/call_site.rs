use alloc::{sync::Arc, vec::Vec};
use core::any::type_name;

use anyhow::anyhow;

use crate::{
    any::{AnyService, ServiceKey, TypeInfo},
    dispose::{AsyncDispose, DisposalHooks, Dispose},
    lifetime::{CacheInfo, Lifetime},
    scope::Scope,
};

/// Ordered, positional view over the already-resolved dependencies of a
/// constructor call-site.
pub struct Args<'a> {
    deps: &'a [AnyService],
}

impl<'a> Args<'a> {
    #[inline]
    #[must_use]
    pub(crate) fn new(deps: &'a [AnyService]) -> Self {
        Self { deps }
    }

    /// Takes the dependency at `index`, downcast to its concrete type.
    ///
    /// # Errors
    /// Returns an error if the index is out of range or the dependency is of
    /// another type. Both indicate a malformed graph, which the graph builder
    /// is expected to have rejected.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, anyhow::Error> {
        let dep = self
            .deps
            .get(index)
            .ok_or_else(|| anyhow!("constructor argument {index} is out of range"))?;
        dep.clone()
            .downcast::<T>()
            .map_err(|_| anyhow!("constructor argument {index} is not a {}", type_name::<T>()))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}

/// Erased constructor of a [`CallSiteKind::Constructor`] site.
pub type CtorFn = Arc<dyn for<'a> Fn(Args<'a>) -> Result<AnyService, anyhow::Error> + Send + Sync>;
/// Erased factory of a [`CallSiteKind::Factory`] site.
pub type FactoryFn = Arc<dyn Fn(&Scope) -> Result<AnyService, anyhow::Error> + Send + Sync>;

/// The closed set of ways a call-site produces a value.
///
/// Both resolution strategies match this exhaustively; there is no open
/// extension point.
pub enum CallSiteKind {
    /// Invokes an erased constructor over the resolved parameter sites,
    /// depth-first and left-to-right.
    Constructor {
        ctor: CtorFn,
        params: Vec<Arc<CallSite>>,
    },
    /// Invokes an erased factory against the requesting scope; the factory
    /// may resolve further services lazily through it.
    Factory { factory: FactoryFn },
    /// Resolves every item site in order and produces the collection.
    Enumerable { items: Vec<Arc<CallSite>> },
    /// The provider self-reference: yields the requesting scope itself,
    /// never constructed and never cached.
    Provider,
    /// A pre-built instance, returned as-is.
    Constant { value: AnyService },
}

/// An immutable description of how to construct one service, with its
/// dependency edges and cache policy.
///
/// Call-sites are produced by the graph builder, shared read-only for the
/// container's lifetime, and may be evaluated many times across many scopes.
/// Ownership of parameter and item sites forms a DAG; cycles are rejected
/// before a graph reaches this crate.
pub struct CallSite {
    key: ServiceKey,
    implementation: Option<TypeInfo>,
    lifetime: Lifetime,
    slot: u32,
    disposal: Option<DisposalHooks>,
    kind: CallSiteKind,
}

impl CallSite {
    /// A constructor site for `T` with the given parameter sites.
    #[must_use]
    pub fn constructor<T, F>(lifetime: Lifetime, params: Vec<Arc<CallSite>>, ctor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(Args<'a>) -> Result<T, anyhow::Error> + Send + Sync + 'static,
    {
        Self {
            key: ServiceKey::of::<T>(),
            implementation: Some(TypeInfo::of::<T>()),
            lifetime,
            slot: 0,
            disposal: None,
            kind: CallSiteKind::Constructor {
                ctor: Arc::new(move |args: Args<'_>| ctor(args).map(|value| Arc::new(value) as AnyService)),
                params,
            },
        }
    }

    /// A factory site for `T`; the factory receives the requesting scope.
    #[must_use]
    pub fn factory<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, anyhow::Error> + Send + Sync + 'static,
    {
        Self {
            key: ServiceKey::of::<T>(),
            implementation: Some(TypeInfo::of::<T>()),
            lifetime,
            slot: 0,
            disposal: None,
            kind: CallSiteKind::Factory {
                factory: Arc::new(move |scope: &Scope| factory(scope).map(|value| Arc::new(value) as AnyService)),
            },
        }
    }

    /// An enumerable site collecting every registered producer of `T`.
    ///
    /// The site is registered under the identity of `Vec<Arc<T>>` and
    /// resolved through [`crate::ServiceProvider::get_all`]. Item sites
    /// sharing the `T` identity are expected to carry distinct slots.
    #[must_use]
    pub fn enumerable<T: Send + Sync + 'static>(lifetime: Lifetime, items: Vec<Arc<CallSite>>) -> Self {
        Self {
            key: ServiceKey::of::<Vec<Arc<T>>>(),
            implementation: None,
            lifetime,
            slot: 0,
            disposal: None,
            kind: CallSiteKind::Enumerable { items },
        }
    }

    /// A constant site wrapping a value created outside the container.
    ///
    /// The container does not own the value: it is never captured for
    /// disposal.
    #[must_use]
    pub fn constant<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            implementation: Some(TypeInfo::of::<T>()),
            lifetime: Lifetime::Transient,
            slot: 0,
            disposal: None,
            kind: CallSiteKind::Constant {
                value: Arc::new(value),
            },
        }
    }

    /// The provider self-reference site.
    #[must_use]
    pub fn provider() -> Self {
        Self {
            key: ServiceKey::of::<Scope>(),
            implementation: None,
            lifetime: Lifetime::Transient,
            slot: 0,
            disposal: None,
            kind: CallSiteKind::Provider,
        }
    }

    /// Re-registers the site under a keyed identity of the same contract.
    #[must_use]
    pub fn keyed(mut self, name: &'static str) -> Self {
        self.key.name = Some(name);
        self
    }

    /// Assigns the cache slot disambiguating this site from other cacheable
    /// sites of the same identity.
    #[must_use]
    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = slot;
        self
    }

    /// Declares that instances of `T` produced here carry a synchronous
    /// disposal capability and must be captured by their owning scope.
    #[must_use]
    pub fn with_dispose<T: Dispose>(mut self) -> Self {
        self.disposal = Some(self.disposal.take().unwrap_or_default().with_sync::<T>());
        self
    }

    /// Declares an asynchronous disposal capability for instances of `T`.
    #[must_use]
    pub fn with_async_dispose<T: AsyncDispose>(mut self) -> Self {
        self.disposal = Some(self.disposal.take().unwrap_or_default().with_async::<T>());
        self
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn implementation(&self) -> Option<TypeInfo> {
        self.implementation
    }

    #[inline]
    #[must_use]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> CacheInfo {
        CacheInfo::new(self.lifetime, self.key, self.slot)
    }

    #[inline]
    #[must_use]
    pub(crate) fn disposal(&self) -> Option<&DisposalHooks> {
        self.disposal.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &CallSiteKind {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{Args, CallSite, CallSiteKind};
    use crate::{
        any::{AnyService, ServiceKey},
        lifetime::{CacheLocation, Lifetime},
    };

    use alloc::{sync::Arc, vec, vec::Vec};

    struct Config(u32);
    struct Repo(Arc<Config>);

    #[test]
    fn test_args_downcast() {
        let deps: Vec<AnyService> = vec![Arc::new(Config(7))];
        let args = Args::new(&deps);

        assert_eq!(args.len(), 1);
        assert_eq!(args.get::<Config>(0).unwrap().0, 7);
        assert!(args.get::<Repo>(0).is_err());
        assert!(args.get::<Config>(1).is_err());
    }

    #[test]
    fn test_cache_info_follows_lifetime() {
        let site = CallSite::factory::<Config, _>(Lifetime::Singleton, |_| Ok(Config(1)));
        assert_eq!(site.cache().location, CacheLocation::Root);
        assert_eq!(site.cache().key.key, ServiceKey::of::<Config>());

        let site = CallSite::constructor::<Repo, _>(Lifetime::Transient, vec![], |args| {
            Ok(Repo(args.get::<Config>(0)?))
        });
        assert_eq!(site.cache().location, CacheLocation::None);
    }

    #[test]
    fn test_keyed_and_slotted_identity() {
        let site = CallSite::factory::<Config, _>(Lifetime::Scoped, |_| Ok(Config(1)))
            .keyed("primary")
            .with_slot(3);

        assert_eq!(site.key(), ServiceKey::keyed::<Config>("primary"));
        assert_eq!(site.cache().key.slot, 3);
        assert_eq!(site.cache().key.key, ServiceKey::keyed::<Config>("primary"));
    }

    #[test]
    fn test_provider_site_is_never_cached() {
        let site = CallSite::provider();
        assert_eq!(site.cache().location, CacheLocation::None);
        assert!(matches!(site.kind(), CallSiteKind::Provider));
    }
}
