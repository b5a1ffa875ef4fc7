//! Persistence Module
//!
//! On-disk representation of the cache for persistent mode.

mod disk;
mod index;

pub use disk::DiskStore;
pub use index::{
    decode_component, encode_component, is_hashed_component, path_component, IndexEntry,
    NamespaceIndex, MAX_COMPONENT_LEN,
};
