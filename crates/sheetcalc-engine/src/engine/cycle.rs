//! Circular dependency detection for formula cells.
//!
//! Edges run from a formula cell to the cells it reads (the dependency
//! index). A cycle through a cell means its formula can never settle; the
//! document stores `#CYCLE!` for such cells instead of recursing forever.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::cell_ref::CellRef;

/// Dependency index: formula cell -> cells it reads.
pub type DependencyIndex = HashMap<CellRef, BTreeSet<CellRef>>;

/// Detect a circular dependency reachable from `start`.
/// Returns Some(cycle_path) if a cycle is found, None otherwise. The path
/// ends with the cell that closes the cycle.
pub fn detect_cycle(start: &CellRef, index: &DependencyIndex) -> Option<Vec<CellRef>> {
    let mut visiting = HashSet::new();
    let mut done = HashSet::new();
    // Cells on the current path, each with the dependencies still to visit.
    let mut stack: Vec<(CellRef, Vec<CellRef>)> = Vec::new();

    let deps = index.get(start)?;
    visiting.insert(*start);
    stack.push((*start, deps.iter().rev().copied().collect()));

    while let Some((_, pending)) = stack.last_mut() {
        let Some(next) = pending.pop() else {
            if let Some((cell, _)) = stack.pop() {
                visiting.remove(&cell);
                done.insert(cell);
            }
            continue;
        };

        if visiting.contains(&next) {
            let mut path: Vec<CellRef> = stack.iter().map(|(cell, _)| *cell).collect();
            path.push(next);
            return Some(path);
        }
        if done.contains(&next) {
            continue;
        }
        match index.get(&next) {
            Some(deps) => {
                visiting.insert(next);
                stack.push((next, deps.iter().rev().copied().collect()));
            }
            None => {
                done.insert(next);
            }
        }
    }
    None
}

/// True when `cell` can reach itself by following dependencies.
pub fn is_on_cycle(cell: &CellRef, index: &DependencyIndex) -> bool {
    reaches_itself(cell, index, |_| true)
}

/// Like [`is_on_cycle`], but only walking through cells in `within`.
pub fn is_on_cycle_within(
    cell: &CellRef,
    index: &DependencyIndex,
    within: &BTreeSet<CellRef>,
) -> bool {
    reaches_itself(cell, index, |c| within.contains(c))
}

fn reaches_itself(
    cell: &CellRef,
    index: &DependencyIndex,
    allowed: impl Fn(&CellRef) -> bool,
) -> bool {
    let mut seen = HashSet::new();
    let mut stack: Vec<CellRef> = index
        .get(cell)
        .map(|deps| deps.iter().copied().collect())
        .unwrap_or_default();

    while let Some(next) = stack.pop() {
        if next == *cell {
            return true;
        }
        if !allowed(&next) || !seen.insert(next) {
            continue;
        }
        if let Some(deps) = index.get(&next) {
            stack.extend(deps.iter().copied());
        }
    }
    false
}
