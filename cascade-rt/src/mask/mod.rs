//! Data masks: nested prefix-selections of attributes within datasets.
//!
//! Masks drive two things: the publish/subscribe dependency graph between
//! models (two models are connected iff their masks overlap) and payload
//! filtering in the update-data broker.

mod tree;

pub use tree::{filter_value, masks_overlap, parse_mask, DataMask, MaskTree};
