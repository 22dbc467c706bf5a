use alloc::{collections::BTreeMap, sync::Arc};

use crate::{any::ServiceKey, call_site::CallSite};

/// The finalized call-site graph handed to the provider.
///
/// Produced by the graph-building collaborator after validation (cycle
/// rejection, missing-dependency checks, last-registration-wins collapsing),
/// then read-only for the container's lifetime.
#[derive(Default)]
pub struct CallSiteRegistry {
    sites: BTreeMap<ServiceKey, Arc<CallSite>>,
}

impl CallSiteRegistry {
    /// Indexes the given root call-sites by their identity.
    ///
    /// Later sites of the same identity shadow earlier ones, matching the
    /// last-registration-wins rule applied upstream.
    #[must_use]
    pub fn from_sites(sites: impl IntoIterator<Item = Arc<CallSite>>) -> Self {
        Self {
            sites: sites.into_iter().map(|site| (site.key(), site)).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<&Arc<CallSite>> {
        self.sites.get(key)
    }

    /// Count of root registrations, for diagnostics.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::CallSiteRegistry;
    use crate::{any::ServiceKey, call_site::CallSite, lifetime::Lifetime};

    use alloc::{sync::Arc, vec};

    struct Config(u32);

    #[test]
    fn test_lookup_by_identity() {
        let registry = CallSiteRegistry::from_sites(vec![
            Arc::new(CallSite::factory::<Config, _>(Lifetime::Singleton, |_| Ok(Config(1)))),
            Arc::new(CallSite::factory::<Config, _>(Lifetime::Singleton, |_| Ok(Config(2))).keyed("replica")),
        ]);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&ServiceKey::of::<Config>()).is_some());
        assert!(registry.get(&ServiceKey::keyed::<Config>("replica")).is_some());
        assert!(registry.get(&ServiceKey::keyed::<Config>("primary")).is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = CallSiteRegistry::from_sites(vec![
            Arc::new(CallSite::factory::<Config, _>(Lifetime::Singleton, |_| Ok(Config(1)))),
            Arc::new(CallSite::factory::<Config, _>(Lifetime::Singleton, |_| Ok(Config(2)))),
        ]);

        assert_eq!(registry.len(), 1);
    }
}
