//! Conversation chains built from parent references.
//!
//! A chain is an ordered list of context ids for one thread. Parent references
//! are best-effort: they may dangle (point at an id that was never stored) or,
//! in a corrupted store, form cycles. None of the functions here fail on
//! either.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use scramble_core::{ContextId, ContextRecord};
use tracing::debug;

/// Add `id` to the chain index.
///
/// - parent set and present in a chain: append to that chain
/// - parent set but in no chain: start `[parent, id]`
/// - no parent: start `[id]`
pub fn link(chains: &mut Vec<Vec<ContextId>>, id: &ContextId, parent: Option<&ContextId>) {
    let Some(parent) = parent else {
        chains.push(vec![id.clone()]);
        return;
    };
    if let Some(chain) = chains.iter_mut().find(|c| c.contains(parent)) {
        chain.push(id.clone());
    } else {
        debug!(context_id = %id.short(), parent = %parent.short(), "parent not in any chain, starting new chain");
        chains.push(vec![parent.clone(), id.clone()]);
    }
}

/// Walk parent pointers from `start` back to the root.
///
/// Stops at a record with no parent, a parent that `lookup` cannot find, or
/// an id already visited. Returns the records oldest first.
pub fn walk<'a, F>(start: &ContextId, lookup: F) -> Vec<Arc<ContextRecord>>
where
    F: Fn(&ContextId) -> Option<&'a Arc<ContextRecord>>,
{
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(start.clone());

    while let Some(id) = current {
        if !visited.insert(id.clone()) {
            debug!(context_id = %id.short(), "parent cycle detected, stopping walk");
            break;
        }
        let Some(record) = lookup(&id) else {
            debug!(context_id = %id.short(), "chain broken, context not found");
            break;
        };
        current = record.parent_context().cloned();
        chain.push(Arc::clone(record));
    }

    chain.reverse();
    chain
}

/// Rebuild every chain from parent references.
///
/// `records` must be in the order roots should be visited. Roots are records
/// with no parent or a parent absent from `records`. Each root yields one
/// chain: a depth-first walk over its descendants, children ordered by
/// creation time. An id consumed by an earlier walk is skipped, so records
/// reachable only through a parent cycle end up in no chain.
pub fn rebuild(records: &[Arc<ContextRecord>]) -> Vec<Vec<ContextId>> {
    let known: HashSet<&ContextId> = records.iter().map(|r| &r.id).collect();

    let mut children: HashMap<&ContextId, Vec<&ContextRecord>> = HashMap::new();
    for record in records {
        if let Some(parent) = record.parent_context() {
            children.entry(parent).or_default().push(record);
        }
    }
    for kids in children.values_mut() {
        kids.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    }

    let mut processed: HashSet<&ContextId> = HashSet::new();
    let mut chains = Vec::new();

    for record in records {
        if processed.contains(&record.id) {
            continue;
        }
        let is_root = record
            .parent_context()
            .is_none_or(|p| !known.contains(p));
        if !is_root {
            continue;
        }

        let mut chain = Vec::new();
        let mut stack = vec![&record.id];
        while let Some(id) = stack.pop() {
            if !processed.insert(id) {
                continue;
            }
            chain.push(id.clone());
            if let Some(kids) = children.get(id) {
                stack.extend(kids.iter().rev().map(|k| &k.id));
            }
        }
        if !chain.is_empty() {
            chains.push(chain);
        }
    }

    let orphaned = records.len().saturating_sub(processed.len());
    if orphaned > 0 {
        debug!(orphaned, "records unreachable from any root left out of chains");
    }
    chains
}
