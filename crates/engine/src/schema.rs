//! Schema dependency closures
//!
//! A closure is the defining file of a message type plus every file it
//! transitively imports, each exactly once. Traversal is breadth-first with a
//! visited set, so diamonds and cycles terminate.

use prost_reflect::FileDescriptor;
use prost_types::FileDescriptorSet;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Breadth-first traversal from `root` along `deps` edges
///
/// Returns every reachable key once, `root` first, in visit order.
pub fn bfs_closure<K, F, I>(root: K, mut deps: F) -> Vec<K>
where
    K: Clone + Eq + Hash,
    F: FnMut(&K) -> I,
    I: IntoIterator<Item = K>,
{
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut order = Vec::new();

    visited.insert(root.clone());
    queue.push_back(root);

    while let Some(key) = queue.pop_front() {
        for dep in deps(&key) {
            if visited.insert(dep.clone()) {
                queue.push_back(dep);
            }
        }
        order.push(key);
    }
    order
}

/// Every schema file needed to decode types defined in `file`
pub fn schema_closure(file: &FileDescriptor) -> FileDescriptorSet {
    let pool = file.parent_pool();
    let names = bfs_closure(file.name().to_string(), |name| {
        pool.get_file_by_name(name)
            .map(|f| f.dependencies().map(|d| d.name().to_string()).collect())
            .unwrap_or_else(Vec::new)
    });

    FileDescriptorSet {
        file: names
            .iter()
            .filter_map(|name| pool.get_file_by_name(name))
            .map(|f| f.file_descriptor_proto().clone())
            .collect(),
    }
}
