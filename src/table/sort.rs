//! Canonical chronological order with sub-rows grouped under their parent.
//!
//! Top-level records get consecutive integer sort groups in `(date, id)`
//! order. Each child gets its parent's group plus a small increment per
//! sibling, so children follow their parent directly regardless of their
//! own dates while keeping their chronological order among siblings.

use crate::core::transaction::TransactionRecord;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Gap between consecutive children of the same parent.
pub const SUB_ROW_INCREMENT: f64 = 0.000_001;

#[derive(Debug, Error, PartialEq)]
pub enum SortError {
    #[error("record {id} references parent {parent_id}, which has no sort group")]
    DanglingParent { id: String, parent_id: String },
}

fn chronological(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id))
}

/// Assign `sort_group` to every record and reorder `records` by it.
pub fn assign_sort_groups(records: &mut [TransactionRecord]) -> Result<(), SortError> {
    records.sort_by(chronological);

    // a child whose parent is not a top-level record is promoted to one
    let top_level: HashSet<String> = records
        .iter()
        .filter(|r| r.parent_id.is_none())
        .map(|r| r.id.clone())
        .collect();

    let mut next_child: HashMap<String, f64> = HashMap::new();
    let mut groups = 0u32;
    for record in records.iter_mut() {
        if let Some(parent) = &record.parent_id {
            if top_level.contains(parent) {
                continue;
            }
        }
        groups += 1;
        record.sort_group = f64::from(groups);
        next_child.insert(record.id.clone(), f64::from(groups) + SUB_ROW_INCREMENT);
    }

    for record in records.iter_mut() {
        let parent_id = match &record.parent_id {
            Some(parent) if top_level.contains(parent) => parent,
            _ => continue,
        };
        let slot = next_child
            .get_mut(parent_id)
            .ok_or_else(|| SortError::DanglingParent {
                id: record.id.clone(),
                parent_id: parent_id.clone(),
            })?;
        record.sort_group = *slot;
        *slot += SUB_ROW_INCREMENT;
    }

    records.sort_by(|a, b| a.sort_group.total_cmp(&b.sort_group));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::TransactionKind;

    fn row(id: &str, date: &str) -> TransactionRecord {
        TransactionRecord::new(id, date, TransactionKind::Trade)
    }

    fn ids(records: &[TransactionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_sort_by_date_then_id() {
        let mut rows = vec![row("b", "2024-01-02"), row("a", "2024-01-01"), row("c", "2024-01-01")];
        assign_sort_groups(&mut rows).unwrap();
        assert_eq!(ids(&rows), vec!["a", "c", "b"]);
        let groups: Vec<f64> = rows.iter().map(|r| r.sort_group).collect();
        assert_eq!(groups, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_child_follows_parent() {
        let mut rows = vec![
            row("b", "2024-01-02"),
            row("a", "2024-01-01"),
            row("a2", "2024-01-05").with_parent("a"),
            row("a1", "2024-01-03").with_parent("a"),
        ];
        assign_sort_groups(&mut rows).unwrap();
        assert_eq!(ids(&rows), vec!["a", "a1", "a2", "b"]);
        assert_eq!(rows[0].sort_group, 1.0);
        assert!(rows[1].sort_group > 1.0 && rows[1].sort_group < 2.0);
        assert!(rows[2].sort_group > rows[1].sort_group && rows[2].sort_group < 2.0);
        assert_eq!(rows[3].sort_group, 2.0);
    }

    #[test]
    fn test_orphan_is_promoted() {
        let mut rows = vec![row("b", "2024-01-02"), row("x", "2024-01-01").with_parent("gone")];
        assign_sort_groups(&mut rows).unwrap();
        assert_eq!(ids(&rows), vec!["x", "b"]);
        assert_eq!(rows[0].sort_group, 1.0);
    }

    #[test]
    fn test_grandchild_is_promoted() {
        let mut rows = vec![
            row("a", "2024-01-01"),
            row("c", "2024-01-02").with_parent("a"),
            row("g", "2024-01-03").with_parent("c"),
        ];
        assign_sort_groups(&mut rows).unwrap();
        assert_eq!(ids(&rows), vec!["a", "c", "g"]);
        assert_eq!(rows[2].sort_group, 2.0);
    }

    #[test]
    fn test_regroup_is_stable() {
        let mut rows = vec![row("b", "2024-01-02"), row("a", "2024-01-01")];
        assign_sort_groups(&mut rows).unwrap();
        let first = rows.clone();
        assign_sort_groups(&mut rows).unwrap();
        assert_eq!(rows, first);
    }
}
