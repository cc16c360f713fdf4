mod arena;
mod handle;
mod node;
mod raw_bptree_map;

pub(crate) use arena::Arena;
pub(crate) use handle::Handle;
pub(crate) use node::{LeafNode, Node};
pub(crate) use raw_bptree_map::RawBPlusTreeMap;
