use alloc::sync::Arc;
use core::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};

/// A resolved service instance, erased for storage in scope caches.
pub type AnyService = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn short_name(&self) -> &'static str {
        self.name.rsplit_once("::").map_or(self.name, |(_, name)| name)
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Identity of one service registration: the contract type plus an optional
/// discriminator used by keyed registrations of the same contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceKey {
    pub type_info: TypeInfo,
    pub name: Option<&'static str>,
}

impl ServiceKey {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn keyed<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: Some(name),
        }
    }
}

impl Display for ServiceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "{} (key = {name:?})", self.type_info),
            None => Display::fmt(&self.type_info, f),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{ServiceKey, TypeInfo};

    use alloc::{format, string::String};

    #[test]
    fn test_short_name() {
        assert_eq!(TypeInfo::of::<String>().short_name(), "String");
        assert_eq!(TypeInfo::of::<u8>().short_name(), "u8");
    }

    #[test]
    fn test_keyed_identity_is_distinct() {
        let plain = ServiceKey::of::<String>();
        let keyed = ServiceKey::keyed::<String>("primary");

        assert_ne!(plain, keyed);
        assert_ne!(keyed, ServiceKey::keyed::<String>("replica"));
        assert_eq!(keyed, ServiceKey::keyed::<String>("primary"));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ServiceKey::of::<String>()), "String");
        assert_eq!(format!("{}", ServiceKey::keyed::<String>("primary")), "String (key = \"primary\")");
    }
}
