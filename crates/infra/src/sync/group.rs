use std::fmt;

use printsync_core::{DomainError, ProductId, Shop, ShopId, ShopRole};

/// One master shop and the shops that mirror it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationGroup {
    master: ShopId,
    dependents: Vec<ShopId>,
}

impl PropagationGroup {
    /// Duplicate dependents are collapsed; listing the master as its own
    /// dependent is an error.
    pub fn new(master: ShopId, dependents: Vec<ShopId>) -> Result<Self, DomainError> {
        if dependents.contains(&master) {
            return Err(DomainError::validation(format!(
                "shop {master} is the master and cannot also be a dependent"
            )));
        }
        let mut unique: Vec<ShopId> = Vec::with_capacity(dependents.len());
        for shop in dependents {
            if !unique.contains(&shop) {
                unique.push(shop);
            }
        }
        Ok(Self {
            master,
            dependents: unique,
        })
    }

    pub fn master(&self) -> &ShopId {
        &self.master
    }

    pub fn dependents(&self) -> &[ShopId] {
        &self.dependents
    }

    pub fn is_dependent(&self, shop_id: &ShopId) -> bool {
        self.dependents.contains(shop_id)
    }

    pub fn shops(&self) -> Vec<Shop> {
        std::iter::once(Shop::master(self.master.clone()))
            .chain(self.dependents.iter().cloned().map(Shop::dependent))
            .collect()
    }

    pub fn role_of(&self, shop_id: &ShopId) -> Option<ShopRole> {
        if *shop_id == self.master {
            Some(ShopRole::Master)
        } else if self.is_dependent(shop_id) {
            Some(ShopRole::Dependent)
        } else {
            None
        }
    }
}

/// Maps a master product to its listing in a dependent shop and back.
pub trait ProductLinks: Send + Sync + fmt::Debug {
    fn dependent_for(&self, master_product: &ProductId, dependent_shop: &ShopId) -> Option<ProductId>;

    fn master_for(&self, dependent_product: &ProductId, dependent_shop: &ShopId) -> Option<ProductId>;
}

/// Products share one identifier across every shop of the group.
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedIdLinks;

impl ProductLinks for SharedIdLinks {
    fn dependent_for(&self, master_product: &ProductId, _dependent_shop: &ShopId) -> Option<ProductId> {
        Some(master_product.clone())
    }

    fn master_for(&self, dependent_product: &ProductId, _dependent_shop: &ShopId) -> Option<ProductId> {
        Some(dependent_product.clone())
    }
}
