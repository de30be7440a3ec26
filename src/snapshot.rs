use std::collections::HashMap;

use crate::process::{Pid, ProcessRecord};

/// Processes of one enumeration grouped by the parent they report.
///
/// Borrows the records, it is built once per render and dropped with it.
#[derive(Debug)]
pub struct SnapshotIndex<'a> {
    records: &'a [ProcessRecord],
    children: HashMap<Pid, Vec<&'a ProcessRecord>>,
    by_pid: HashMap<Pid, &'a ProcessRecord>,
}

impl<'a> SnapshotIndex<'a> {
    pub fn new(records: &'a [ProcessRecord]) -> Self {
        let mut children: HashMap<Pid, Vec<&ProcessRecord>> = HashMap::new();
        let mut by_pid = HashMap::with_capacity(records.len());
        for record in records {
            children.entry(record.ppid).or_default().push(record);
            by_pid.insert(record.pid, record);
        }

        Self {
            records,
            children,
            by_pid,
        }
    }

    /// Records in enumeration order
    pub fn records(&self) -> &'a [ProcessRecord] {
        self.records
    }

    /// Records reporting `ppid` as their parent, in enumeration order
    pub fn children_of(&self, ppid: Pid) -> &[&'a ProcessRecord] {
        self.children.get(&ppid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, pid: Pid) -> Option<&'a ProcessRecord> {
        self.by_pid.get(&pid).copied()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.by_pid.contains_key(&pid)
    }

    /// Whether the record starts a branch of the forest: its parent is not part of the
    /// snapshot, or it claims to be its own parent
    pub fn is_entry(&self, record: &ProcessRecord) -> bool {
        record.ppid == record.pid || !self.contains(record.ppid)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::record;

    #[test]
    fn test_empty_snapshot() {
        let index = SnapshotIndex::new(&[]);
        assert!(index.is_empty());
        assert!(index.children_of(0).is_empty());
    }

    #[test]
    fn test_children_keep_enumeration_order() {
        let records = vec![
            record(30, 1, "dcrd"),
            record(10, 1, "dcrwallet"),
            record(20, 30, "dcrctl"),
            record(40, 1, "dcrdata"),
        ];
        let index = SnapshotIndex::new(&records);

        let children: Vec<_> = index.children_of(1).iter().map(|p| p.pid).collect();
        assert_eq!(children, vec![30, 10, 40]);
        let children: Vec<_> = index.children_of(30).iter().map(|p| p.pid).collect();
        assert_eq!(children, vec![20]);
        assert!(index.children_of(20).is_empty());
    }

    #[test]
    fn test_every_record_is_in_exactly_one_bucket() {
        let records = vec![
            record(2, 1, "dcrd"),
            record(3, 2, "dcrwallet"),
            record(4, 2, "dcrctl"),
            record(5, 5, "dcrdata"),
        ];
        let index = SnapshotIndex::new(&records);

        let bucketed: usize = [1, 2, 3, 4, 5]
            .iter()
            .map(|ppid| index.children_of(*ppid).len())
            .sum();
        assert_eq!(bucketed, records.len());
    }

    #[test]
    fn test_entries() {
        let records = vec![
            record(2, 1, "dcrd"),
            record(3, 2, "dcrwallet"),
            record(5, 5, "dcrdata"),
        ];
        let index = SnapshotIndex::new(&records);

        assert!(index.is_entry(&records[0]));
        assert!(!index.is_entry(&records[1]));
        assert!(index.is_entry(&records[2]));
    }
}
