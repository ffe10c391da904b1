//! Vector index and similarity search
//!
//! A [`FlatIndex`] is built per request from a corpus snapshot and dropped
//! afterwards. Scale-out structures (partitioned or approximate) can replace
//! it behind the same `build`/`search` pair.

pub mod index;

pub use index::{inner_product, search, FlatIndex, IndexError, IndexResult, Neighbor};
