//! Domain models for the multisplit inventory dashboard

mod order;
mod product;
mod snapshot;

pub use order::*;
pub use product::*;
pub use snapshot::*;
