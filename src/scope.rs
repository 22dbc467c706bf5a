use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::{
    any::{Any, TypeId},
    mem,
    sync::atomic::{AtomicBool, Ordering},
};
use parking_lot::Mutex;
use tracing::{debug, debug_span, error};

use crate::{
    any::{AnyService, ServiceKey},
    dispose::Disposer,
    errors::{DisposeErrorKind, ResolveErrorKind},
    lifetime::CacheKey,
    observe::TeardownReport,
    provider::ProviderShared,
};

/// One resolution context: the root (container-lifetime) scope or a
/// caller-managed child scope.
///
/// A scope owns a resolved-instance cache and a disposal list, both protected
/// by one guard. Handles are cheap to clone and share the same scope.
#[derive(Clone)]
pub struct Scope {
    pub(crate) inner: Arc<ScopeInner>,
}

pub(crate) struct ScopeInner {
    id: u64,
    /// Root scope handle; absent when this scope is the root itself.
    root: Option<Scope>,
    shared: Arc<ProviderShared>,
    /// Written only while holding `state`; read lock-free by entry points.
    disposed: AtomicBool,
    state: Mutex<ScopeState>,
}

struct ScopeState {
    resolved: BTreeMap<CacheKey, AnyService>,
    disposables: Vec<Disposer>,
}

impl Scope {
    #[inline]
    #[must_use]
    pub(crate) fn root(shared: Arc<ProviderShared>) -> Self {
        Self::new(0, None, shared)
    }

    #[inline]
    #[must_use]
    pub(crate) fn child(shared: Arc<ProviderShared>, root: Scope) -> Self {
        Self::new(shared.next_scope_id(), Some(root), shared)
    }

    fn new(id: u64, root: Option<Scope>, shared: Arc<ProviderShared>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id,
                root,
                shared,
                disposed: AtomicBool::new(false),
                state: Mutex::new(ScopeState {
                    resolved: BTreeMap::new(),
                    disposables: Vec::new(),
                }),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.inner.root.is_none()
    }

    #[inline]
    #[must_use]
    pub(crate) fn root_handle(&self) -> &Scope {
        self.inner.root.as_ref().unwrap_or(self)
    }

    /// Gets a service from this scope, or `None` when the identity has no
    /// registration.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::AlreadyDisposed`] after teardown of this
    /// scope or its container, and propagates construction failures
    /// unmodified.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        let key = ServiceKey::of::<T>();
        match self.resolve(&key)? {
            Some(instance) => downcast_service(key, instance).map(Some),
            None => Ok(None),
        }
    }

    /// Gets a service from this scope, failing when it has no registration.
    #[allow(clippy::missing_errors_doc)]
    pub fn get_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.get::<T>()?.ok_or_else(|| not_registered(ServiceKey::of::<T>()))
    }

    /// Gets the keyed registration of a service.
    #[allow(clippy::missing_errors_doc)]
    pub fn get_keyed<T: Send + Sync + 'static>(&self, name: &'static str) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        let key = ServiceKey::keyed::<T>(name);
        match self.resolve(&key)? {
            Some(instance) => downcast_service(key, instance).map(Some),
            None => Ok(None),
        }
    }

    /// Gets the keyed registration of a service, failing when absent.
    #[allow(clippy::missing_errors_doc)]
    pub fn get_required_keyed<T: Send + Sync + 'static>(&self, name: &'static str) -> Result<Arc<T>, ResolveErrorKind> {
        self.get_keyed::<T>(name)?
            .ok_or_else(|| not_registered(ServiceKey::keyed::<T>(name)))
    }

    /// Gets every instance produced by the enumerable site of `T`, in item
    /// order. An absent enumerable registration yields an empty vector.
    #[allow(clippy::missing_errors_doc)]
    pub fn get_all<T: Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        let key = ServiceKey::of::<Vec<Arc<T>>>();
        let Some(instance) = self.resolve(&key)? else {
            return Ok(Vec::new());
        };
        let items = downcast_service::<Vec<AnyService>>(key, instance)?;
        items
            .iter()
            .map(|item| downcast_service(ServiceKey::of::<T>(), item.clone()))
            .collect()
    }

    pub(crate) fn resolve(&self, key: &ServiceKey) -> Result<Option<AnyService>, ResolveErrorKind> {
        if self.inner.disposed.load(Ordering::Acquire) || self.inner.shared.disposed.load(Ordering::Acquire) {
            let err = ResolveErrorKind::AlreadyDisposed;
            error!("{}", err);
            return Err(err);
        }

        let span = debug_span!("resolve", service = %key, scope = self.inner.id);
        let _guard = span.enter();

        let Some(site) = self.inner.shared.registry.get(key) else {
            debug!("Not found in registry");
            return Ok(None);
        };

        let resolver = self.inner.shared.realized(site);
        (*resolver)(self).map(Some)
    }

    /// The scope itself, erased the way the provider self-reference site
    /// yields it.
    #[inline]
    #[must_use]
    pub(crate) fn as_service(&self) -> AnyService {
        Arc::new(self.clone())
    }

    #[must_use]
    pub(crate) fn cached(&self, key: &CacheKey) -> Option<AnyService> {
        self.inner.state.lock().resolved.get(key).cloned()
    }

    /// Inserts a freshly constructed instance, keeping the already-cached one
    /// when another caller won the insert race. The winning insert also
    /// appends the instance's disposer, atomically under the scope guard.
    pub(crate) fn insert_or_existing(
        &self,
        key: CacheKey,
        instance: AnyService,
        disposer: Option<Disposer>,
    ) -> Result<AnyService, ResolveErrorKind> {
        {
            let mut state = self.inner.state.lock();
            if !self.inner.disposed.load(Ordering::Relaxed) {
                if let Some(existing) = state.resolved.get(&key) {
                    // Lost the insert race: the first instance keeps the slot
                    // and this one is discarded without capture.
                    debug!("Already cached by a concurrent resolution");
                    return Ok(existing.clone());
                }
                state.resolved.insert(key, instance.clone());
                debug!("Cached");
                if let Some(disposer) = disposer {
                    state.disposables.push(disposer);
                    debug!("Captured for disposal");
                }
                return Ok(instance);
            }
        }

        // The scope closed while the instance was being built. Tear it down
        // outside the guard, then fail the resolution.
        if let Some(disposer) = disposer {
            disposer.dispose_now();
        }
        let err = ResolveErrorKind::AlreadyDisposed;
        error!("{}", err);
        Err(err)
    }

    /// Appends a transient instance's disposer to the disposal list.
    ///
    /// When the guard reveals the scope already closed, the candidate is
    /// disposed immediately outside the guard and the resolution fails.
    pub(crate) fn capture(&self, disposer: Disposer) -> Result<(), ResolveErrorKind> {
        {
            let mut state = self.inner.state.lock();
            if !self.inner.disposed.load(Ordering::Relaxed) {
                state.disposables.push(disposer);
                debug!("Captured for disposal");
                return Ok(());
            }
        }

        disposer.dispose_now();
        let err = ResolveErrorKind::AlreadyDisposed;
        error!("{}", err);
        Err(err)
    }

    /// Tears the scope down, disposing captured instances in reverse
    /// creation order. Closing the root scope closes the container.
    ///
    /// A second call is a no-op.
    ///
    /// # Errors
    /// Returns [`DisposeErrorKind::SyncDisposalUnsupported`] when an entry
    /// exposes only an asynchronous disposal path; teardown of the remaining
    /// entries is aborted.
    pub fn close(&self) -> Result<(), DisposeErrorKind> {
        self.inner.close_sync()
    }

    /// Tears the scope down, preferring each entry's asynchronous disposal
    /// path and awaiting it before the next entry, in reverse creation order.
    ///
    /// A second call is a no-op.
    pub async fn close_async(&self) {
        self.inner.close_async().await;
    }
}

impl ScopeInner {
    /// Atomically flips the disposed flag and takes the disposal list; the
    /// list is final from here on. Reports the scope to the observability
    /// hook. Returns `None` when the scope was already closed.
    fn begin_close(&self) -> Option<Vec<Disposer>> {
        let (disposers, resolved) = {
            let mut state = self.state.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return None;
            }
            (mem::take(&mut state.disposables), state.resolved.len())
        };

        // Root scope and container are two views of one lifetime: whichever
        // closes first marks the other closed before any entry is disposed,
        // so the cascade cannot recurse.
        if self.root.is_none() {
            self.shared.disposed.store(true, Ordering::Release);
        }

        debug!(
            scope = self.id,
            resolved,
            disposables = disposers.len(),
            "Scope closed"
        );
        if let Some(observer) = &self.shared.observer {
            observer.scope_closed(&TeardownReport {
                scope_id: self.id,
                is_root: self.root.is_none(),
                resolved,
                disposables: disposers.len(),
            });
        }

        Some(disposers)
    }

    fn close_sync(&self) -> Result<(), DisposeErrorKind> {
        let Some(mut disposers) = self.begin_close() else {
            return Ok(());
        };
        while let Some(disposer) = disposers.pop() {
            disposer.dispose_sync()?;
        }
        Ok(())
    }

    async fn close_async(&self) {
        let Some(mut disposers) = self.begin_close() else {
            return;
        };
        while let Some(disposer) = disposers.pop() {
            disposer.dispose_async().await;
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if let Err(err) = self.close_sync() {
            error!("{}", err);
        }
        debug!("Scope closed on drop");
    }
}

fn not_registered(key: ServiceKey) -> ResolveErrorKind {
    let err = ResolveErrorKind::NotRegistered { key };
    error!("{}", err);
    err
}

fn downcast_service<T: Send + Sync + 'static>(key: ServiceKey, instance: AnyService) -> Result<Arc<T>, ResolveErrorKind> {
    let actual = (*instance).type_id();
    instance.downcast::<T>().map_err(|_| {
        let err = ResolveErrorKind::IncorrectType {
            key,
            expected: TypeId::of::<T>(),
            actual,
        };
        error!("{}", err);
        err
    })
}
