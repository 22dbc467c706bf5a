/// Snapshot of a scope at the moment its teardown begins.
#[derive(Debug, Clone, Copy)]
pub struct TeardownReport {
    /// Identity of the scope being torn down. The root scope is always `0`.
    pub scope_id: u64,
    pub is_root: bool,
    /// Entries left in the resolved-instance cache. The cache itself is kept
    /// intact through teardown.
    pub resolved: usize,
    /// Captured disposables about to be torn down in reverse order.
    pub disposables: usize,
}

/// Teardown observability hook.
///
/// Invoked exactly once per scope, after the disposal list is captured and
/// before any entry is disposed. A pure reporting side effect: the return is
/// ignored and the hook has no influence on teardown.
pub trait TeardownObserver: Send + Sync {
    fn scope_closed(&self, report: &TeardownReport);
}

impl<F> TeardownObserver for F
where
    F: Fn(&TeardownReport) + Send + Sync,
{
    #[inline]
    fn scope_closed(&self, report: &TeardownReport) {
        self(report);
    }
}
