//! Item extraction module
//!
//! Normalizes a page body into a list of items and gives every item a stable
//! string identifier.
//!
//! # Overview
//!
//! Items are looked up in the body itself when it is a list, then in the
//! `data`, `items` and `orders` fields; anything else is treated as a single
//! item. Identifiers come from the first present field of an ordered list
//! (`id`, `Id`, `ID`, `_id`, `pin_id`, `board_id`, `order_id`, `product_id`)
//! and are synthesized deterministically when none is present.

mod extractor;

pub use extractor::{
    strip_transport_fields, ExtractedItem, ItemExtractor, DEFAULT_CONTAINERS, DEFAULT_ID_FIELDS,
    TRANSPORT_FIELDS,
};

#[cfg(test)]
mod tests;
