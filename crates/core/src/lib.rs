//! `printsync-core`: catalog domain building blocks.
//!
//! This crate contains **pure domain** primitives shared by the pricing engine
//! and its adapters (no IO, no HTTP, no storage).

pub mod catalog;
pub mod error;
pub mod id;
pub mod money;
pub mod operation;
pub mod size;

pub use catalog::{
    Product, ProductPage, ProductPatch, ProductSummary, Shop, ShopRole, Variant, VariantPatch,
};
pub use error::DomainError;
pub use id::{CategoryId, ProductId, ShopId, VariantId};
pub use money::Cents;
pub use operation::OperationType;
pub use size::SizeLabel;
