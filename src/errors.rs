use core::any::TypeId;

use crate::any::{ServiceKey, TypeInfo};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Provider or scope is already disposed")]
    AlreadyDisposed,
    #[error("Call site not found in registry for {key}")]
    NotRegistered { key: ServiceKey },
    #[error("Incorrect call site provides type for {key}. Actual: {actual:?}, expected: {expected:?}")]
    IncorrectType {
        key: ServiceKey,
        expected: TypeId,
        actual: TypeId,
    },
    #[error(transparent)]
    Construction(anyhow::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum DisposeErrorKind {
    #[error(
        "{type_info} provides only an asynchronous disposal path. \
        Use asynchronous teardown, or give the service a synchronous disposal capability."
    )]
    SyncDisposalUnsupported { type_info: TypeInfo },
}
