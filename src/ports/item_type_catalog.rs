//! Item type catalog port.

use async_trait::async_trait;

use crate::domain::fee::ItemType;
use crate::domain::foundation::DomainError;

/// Read access to the item type catalog.
#[async_trait]
pub trait ItemTypeCatalog: Send + Sync {
    /// Looks up an active or inactive item type by its catalog code.
    async fn find_by_code(&self, code: &str) -> Result<Option<ItemType>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_catalog_is_object_safe() {
        fn _accepts_dyn(_catalog: &dyn ItemTypeCatalog) {}
    }
}
