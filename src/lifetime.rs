use crate::any::ServiceKey;

/// How long an instance produced by a call-site lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// A fresh instance on every resolution, never cached.
    Transient,
    /// One instance per scope, cached in the requesting scope.
    Scoped,
    /// One instance per container, cached in the root scope.
    Singleton,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub(crate) fn cache_location(self) -> CacheLocation {
        match self {
            Lifetime::Transient => CacheLocation::None,
            Lifetime::Scoped => CacheLocation::Scope,
            Lifetime::Singleton => CacheLocation::Root,
        }
    }
}

/// Which scope's cache holds the result of a call-site, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLocation {
    None,
    Scope,
    Root,
}

/// Index of one cacheable call-site in a scope's resolved-instance map.
///
/// The slot disambiguates cacheable sites that share a service identity,
/// such as the items of an enumerable site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CacheKey {
    pub key: ServiceKey,
    pub slot: u32,
}

/// Cache policy of one call-site, fixed at graph build.
#[derive(Debug, Clone, Copy)]
pub struct CacheInfo {
    pub location: CacheLocation,
    pub key: CacheKey,
}

impl CacheInfo {
    #[inline]
    #[must_use]
    pub(crate) fn new(lifetime: Lifetime, key: ServiceKey, slot: u32) -> Self {
        Self {
            location: lifetime.cache_location(),
            key: CacheKey { key, slot },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheInfo, CacheLocation, Lifetime};
    use crate::any::ServiceKey;

    #[test]
    fn test_lifetime_to_location() {
        assert_eq!(Lifetime::Transient.cache_location(), CacheLocation::None);
        assert_eq!(Lifetime::Scoped.cache_location(), CacheLocation::Scope);
        assert_eq!(Lifetime::Singleton.cache_location(), CacheLocation::Root);
    }

    #[test]
    fn test_slot_disambiguates() {
        let key = ServiceKey::of::<u8>();
        let first = CacheInfo::new(Lifetime::Scoped, key, 0);
        let second = CacheInfo::new(Lifetime::Scoped, key, 1);

        assert_ne!(first.key, second.key);
        assert_eq!(first.key.key, second.key.key);
    }
}
