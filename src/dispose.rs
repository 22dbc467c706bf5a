use alloc::sync::Arc;
use futures_core::future::BoxFuture;
use tracing::debug;

use crate::{
    any::{AnyService, TypeInfo},
    errors::DisposeErrorKind,
};

/// Synchronous teardown capability of a service.
///
/// Instances whose call-site declares this capability are registered with the
/// scope that owns them and torn down, in reverse creation order, when the
/// scope is closed.
pub trait Dispose: Send + Sync + 'static {
    fn dispose(&self);
}

/// Asynchronous teardown capability of a service.
///
/// Preferred by [`crate::Scope::close_async`]; a service exposing only this
/// capability is rejected by synchronous teardown.
pub trait AsyncDispose: Send + Sync + 'static {
    fn dispose(&self) -> BoxFuture<'static, ()>;
}

/// Teardown hooks attached to a call-site at graph build time.
///
/// The hooks close over the concrete service type, so a freshly constructed
/// erased instance can be rewrapped into its disposal capabilities without the
/// engine knowing the type.
#[derive(Clone, Default)]
pub struct DisposalHooks {
    sync: Option<Arc<dyn Fn(&AnyService) -> Arc<dyn Dispose> + Send + Sync>>,
    r#async: Option<Arc<dyn Fn(&AnyService) -> Arc<dyn AsyncDispose> + Send + Sync>>,
    type_info: Option<TypeInfo>,
}

impl DisposalHooks {
    #[must_use]
    pub(crate) fn with_sync<T: Dispose>(mut self) -> Self {
        self.type_info = Some(TypeInfo::of::<T>());
        self.sync = Some(Arc::new(|instance: &AnyService| {
            instance
                .clone()
                .downcast::<T>()
                .expect("Failed to downcast value in disposal hook") as Arc<dyn Dispose>
        }));
        self
    }

    #[must_use]
    pub(crate) fn with_async<T: AsyncDispose>(mut self) -> Self {
        self.type_info = Some(TypeInfo::of::<T>());
        self.r#async = Some(Arc::new(|instance: &AnyService| {
            instance
                .clone()
                .downcast::<T>()
                .expect("Failed to downcast value in disposal hook") as Arc<dyn AsyncDispose>
        }));
        self
    }

    /// Binds the hooks to a constructed instance, producing the entry that
    /// goes onto a scope's disposal list.
    #[must_use]
    pub(crate) fn bind(&self, instance: &AnyService) -> Disposer {
        Disposer {
            sync: self.sync.as_ref().map(|hook| (**hook)(instance)),
            r#async: self.r#async.as_ref().map(|hook| (**hook)(instance)),
            type_info: self.type_info.unwrap_or_else(TypeInfo::of::<()>),
        }
    }
}

/// One captured entry of a scope's disposal list.
pub(crate) struct Disposer {
    sync: Option<Arc<dyn Dispose>>,
    r#async: Option<Arc<dyn AsyncDispose>>,
    type_info: TypeInfo,
}

impl Disposer {
    /// Synchronous teardown path. An entry exposing only an asynchronous
    /// capability is a usage error under synchronous teardown.
    pub(crate) fn dispose_sync(&self) -> Result<(), DisposeErrorKind> {
        match &self.sync {
            Some(disposable) => {
                disposable.dispose();
                debug!(service = %self.type_info, "Disposed");
                Ok(())
            }
            None => Err(DisposeErrorKind::SyncDisposalUnsupported {
                type_info: self.type_info,
            }),
        }
    }

    /// Asynchronous teardown path, falling back to the synchronous one.
    pub(crate) async fn dispose_async(&self) {
        if let Some(disposable) = &self.r#async {
            disposable.dispose().await;
        } else if let Some(disposable) = &self.sync {
            disposable.dispose();
        }
        debug!(service = %self.type_info, "Disposed");
    }

    /// Immediate teardown used when a candidate reaches an already-closed
    /// scope: the synchronous path when present, otherwise a blocking wait on
    /// the asynchronous one. The only place in the crate that blocks.
    pub(crate) fn dispose_now(self) {
        if let Some(disposable) = self.sync {
            disposable.dispose();
        } else if let Some(disposable) = self.r#async {
            futures_executor::block_on(disposable.dispose());
        }
        debug!(service = %self.type_info, "Disposed out of band");
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{AsyncDispose, DisposalHooks, Dispose};
    use crate::any::AnyService;

    use alloc::{boxed::Box, sync::Arc};
    use core::sync::atomic::{AtomicU8, Ordering};
    use futures_core::future::BoxFuture;

    struct SyncOnly(Arc<AtomicU8>);

    impl Dispose for SyncOnly {
        fn dispose(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct AsyncOnly(Arc<AtomicU8>);

    impl AsyncDispose for AsyncOnly {
        fn dispose(&self) -> BoxFuture<'static, ()> {
            let count = self.0.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    #[test]
    fn test_sync_teardown() {
        let count = Arc::new(AtomicU8::new(0));
        let instance: AnyService = Arc::new(SyncOnly(count.clone()));

        let disposer = DisposalHooks::default().with_sync::<SyncOnly>().bind(&instance);
        disposer.dispose_sync().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sync_teardown_rejects_async_only() {
        let count = Arc::new(AtomicU8::new(0));
        let instance: AnyService = Arc::new(AsyncOnly(count.clone()));

        let disposer = DisposalHooks::default().with_async::<AsyncOnly>().bind(&instance);
        assert!(disposer.dispose_sync().is_err());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_immediate_teardown_blocks_on_async_path() {
        let count = Arc::new(AtomicU8::new(0));
        let instance: AnyService = Arc::new(AsyncOnly(count.clone()));

        let disposer = DisposalHooks::default().with_async::<AsyncOnly>().bind(&instance);
        disposer.dispose_now();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_teardown_falls_back_to_sync() {
        let count = Arc::new(AtomicU8::new(0));
        let instance: AnyService = Arc::new(SyncOnly(count.clone()));

        let disposer = DisposalHooks::default().with_sync::<SyncOnly>().bind(&instance);
        disposer.dispose_async().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
