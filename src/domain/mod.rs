//! Domain model: products, taxonomy, enquiries, filter selections.

pub mod enquiry;
pub mod product;
pub mod selection;
pub mod taxonomy;
