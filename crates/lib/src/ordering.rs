//! Dense integer ordering of sibling groups.
//!
//! Sibling sequence is defined by each entity's `order` field, never by its
//! storage position: concurrent inserts and deletes merge positions
//! non-deterministically, while an explicit integer merges per field.
//! After every membership change the affected group is renumbered so that
//! sorting by `order` yields exactly `0..n`.
//!
//! Renumbering costs O(n) per structural change. A fractional index would
//! make inserts O(1) amortized at the cost of periodic renormalization; the
//! dense scheme keeps comparisons trivial and never runs out of precision.

use crate::model::Ordered;
use crate::store::StructureError;

/// Sort `items` by their stored order, falling back to the position in the
/// input when an order is missing. Ties keep input order.
pub fn sort_by_stored_order<K>(items: Vec<(K, Option<i64>)>) -> Vec<K> {
    let mut keyed: Vec<(i64, usize, K)> = items
        .into_iter()
        .enumerate()
        .map(|(position, (key, order))| (order.unwrap_or(position as i64), position, key))
        .collect();
    keyed.sort_by_key(|(order, position, _)| (*order, *position));
    keyed.into_iter().map(|(_, _, key)| key).collect()
}

/// Assign `order = index` to every sibling in traversal order.
///
/// Returns the number of siblings whose order changed.
pub fn renumber<E: Ordered>(siblings: &mut [E]) -> usize {
    let mut changed = 0;
    for (index, sibling) in siblings.iter_mut().enumerate() {
        let order = index as i64;
        if sibling.order() != order {
            sibling.set_order(order);
            changed += 1;
        }
    }
    changed
}

/// Check that an index addresses a slot in `0..=len`.
pub fn check_index(operation: &'static str, index: i64, len: usize) -> Result<usize, StructureError> {
    if index < 0 || index as u64 > len as u64 {
        return Err(StructureError::InvalidIndex {
            operation,
            index,
            len,
        });
    }
    Ok(index as usize)
}

/// Insert `entity` at `index` (or at the end when `None`) and renumber.
pub fn insert_at<E: Ordered>(
    operation: &'static str,
    siblings: &mut Vec<E>,
    entity: E,
    index: Option<i64>,
) -> Result<usize, StructureError> {
    let index = match index {
        Some(index) => check_index(operation, index, siblings.len())?,
        None => siblings.len(),
    };
    siblings.insert(index, entity);
    renumber(siblings);
    Ok(index)
}

/// Remove the sibling at `index` and renumber the rest.
pub fn remove_at<E: Ordered>(siblings: &mut Vec<E>, index: usize) -> Option<E> {
    if index >= siblings.len() {
        return None;
    }
    let removed = siblings.remove(index);
    renumber(siblings);
    Some(removed)
}

/// Move the sibling at position `from` to position `to` within a group
/// whose orders are dense, using the shift rule:
///
/// * moving to a lower index increments every sibling in `[to, from)`,
/// * moving to a higher index decrements every sibling in `(from, to]`,
/// * the moved sibling's order is set last, to `to`.
///
/// The slice is re-sorted afterwards so that traversal order matches the
/// new orders.
pub fn shift_move<E: Ordered>(
    operation: &'static str,
    siblings: &mut [E],
    from: usize,
    to: i64,
) -> Result<(), StructureError> {
    let last = siblings.len().saturating_sub(1);
    let to = check_index(operation, to, last)?;
    if from > last {
        return Err(StructureError::invariant(format!(
            "{operation}: source position {from} outside group of {}",
            siblings.len()
        )));
    }
    let old = from as i64;
    let new = to as i64;
    for (position, sibling) in siblings.iter_mut().enumerate() {
        if position == from {
            continue;
        }
        let order = sibling.order();
        if new < old && order >= new && order < old {
            sibling.set_order(order + 1);
        } else if new > old && order > old && order <= new {
            sibling.set_order(order - 1);
        }
    }
    siblings[from].set_order(new);
    siblings.sort_by_key(|s| s.order());
    Ok(())
}

/// True when the orders are exactly a permutation of `0..n`.
pub fn is_dense(orders: impl IntoIterator<Item = i64>) -> bool {
    let mut orders: Vec<i64> = orders.into_iter().collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(i, &o)| o == i as i64)
}
