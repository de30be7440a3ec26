//! Process tree rendering.
//!
//! The forest is seeded from every process whose parent is not part of the snapshot
//! (or which claims to be its own parent). Each seed opens a branch labelled with the
//! parent identifier, under which the processes reporting that parent are expanded
//! depth-first. Every identifier is expanded at most once per render, which is what
//! keeps inconsistent snapshots (PID reuse, cycles) from recursing forever.

use std::collections::HashSet;
use std::fmt;

use crate::prelude::*;
use crate::process::{Pid, ProcessRecord};
use crate::snapshot::SnapshotIndex;

pub const ROOT_LABEL: &str = "...";
const BRANCH: &str = "├──";
const LAST_BRANCH: &str = "└──";
const PIPE_INDENT: &str = "│   ";
const SPACE_INDENT: &str = "    ";
const AGENT_MARKER: &str = "[*]";

/// Deepest level expanded, parent chains of real hosts stay far below it
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLabel<'a> {
    /// Processes grouped under a parent identifier
    Group(Pid),
    Process(&'a ProcessRecord),
}

impl fmt::Display for NodeLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLabel::Group(ppid) => write!(f, "{ppid}"),
            NodeLabel::Process(p) => {
                write!(f, "{} ({}) {{{}}}", p.pid, p.exec_name, p.build_version)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode<'a> {
    pub label: NodeLabel<'a>,
    pub children: Vec<TreeNode<'a>>,
}

impl TreeNode<'_> {
    pub fn has_agent(&self) -> bool {
        matches!(self.label, NodeLabel::Process(p) if p.is_agent)
    }
}

/// Rendered forest of one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTree<'a> {
    pub roots: Vec<TreeNode<'a>>,
    /// Number of distinct processes present in the forest
    pub process_count: usize,
}

impl<'a> ProcessTree<'a> {
    pub fn build(index: &SnapshotIndex<'a>) -> Self {
        TreeRenderer::new(index).build()
    }
}

/// Depth-first expansion state, alive for a single render
struct TreeRenderer<'s, 'a> {
    index: &'s SnapshotIndex<'a>,
    /// Identifiers whose children were already expanded
    visited: HashSet<Pid>,
    process_count: usize,
}

impl<'s, 'a> TreeRenderer<'s, 'a> {
    fn new(index: &'s SnapshotIndex<'a>) -> Self {
        Self {
            index,
            visited: HashSet::new(),
            process_count: 0,
        }
    }

    fn build(mut self) -> ProcessTree<'a> {
        let index = self.index;
        let mut roots = Vec::new();

        for record in index.records() {
            if index.is_entry(record) {
                roots.extend(self.expand_group(record));
            }
        }

        // Whatever is left only hangs off parent cycles
        for record in index.records() {
            if self.visited.contains(&record.pid) {
                continue;
            }
            let seed = self.cycle_member(record);
            debug!(
                "Process {} is part of a parent cycle, rendering it as a root",
                seed.pid
            );
            roots.extend(self.expand(seed, 0));
        }

        ProcessTree {
            roots,
            process_count: self.process_count,
        }
    }

    /// Branch for the parent reported by an entry process
    fn expand_group(&mut self, entry: &'a ProcessRecord) -> Option<TreeNode<'a>> {
        let ppid = entry.ppid;
        if !self.visited.insert(ppid) {
            trace!("Parent {ppid} already expanded, skipping");
            return None;
        }
        if entry.pid == ppid {
            // A self-parented process is its own group
            self.process_count += 1;
        }

        Some(TreeNode {
            label: NodeLabel::Group(ppid),
            children: self.expand_children(ppid, 1),
        })
    }

    fn expand(&mut self, record: &'a ProcessRecord, depth: usize) -> Option<TreeNode<'a>> {
        if !self.visited.insert(record.pid) {
            trace!("Process {} already expanded, skipping", record.pid);
            return None;
        }
        self.process_count += 1;

        Some(TreeNode {
            label: NodeLabel::Process(record),
            children: self.expand_children(record.pid, depth + 1),
        })
    }

    fn expand_children(&mut self, ppid: Pid, depth: usize) -> Vec<TreeNode<'a>> {
        let index = self.index;
        let children = index.children_of(ppid);
        if depth >= MAX_DEPTH && !children.is_empty() {
            warn!(
                "Process tree deeper than {MAX_DEPTH} levels, not expanding children of {ppid}"
            );
            return Vec::new();
        }

        children
            .iter()
            .filter_map(|&child| self.expand(child, depth))
            .collect()
    }

    /// Walk up the unexpanded ancestors of `record` until one repeats
    fn cycle_member(&self, record: &'a ProcessRecord) -> &'a ProcessRecord {
        let mut seen = HashSet::new();
        let mut current = record;
        while seen.insert(current.pid) {
            match self.index.get(current.ppid) {
                Some(parent) if !self.visited.contains(&parent.pid) => current = parent,
                _ => break,
            }
        }
        current
    }
}

fn write_nodes(
    f: &mut fmt::Formatter<'_>,
    nodes: &[TreeNode],
    prefix: &mut String,
) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == nodes.len();
        let edge = if is_last { LAST_BRANCH } else { BRANCH };
        if node.has_agent() {
            writeln!(f, "{prefix}{edge} {AGENT_MARKER}  {}", node.label)?;
        } else {
            writeln!(f, "{prefix}{edge} {}", node.label)?;
        }

        let prefix_len = prefix.len();
        prefix.push_str(if is_last { SPACE_INDENT } else { PIPE_INDENT });
        write_nodes(f, &node.children, prefix)?;
        prefix.truncate(prefix_len);
    }
    Ok(())
}

impl fmt::Display for ProcessTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{ROOT_LABEL}")?;
        write_nodes(f, &self.roots, &mut String::new())
    }
}

/// Render the tree of already filtered processes
pub fn render_tree(records: &[ProcessRecord]) -> String {
    let index = SnapshotIndex::new(records);
    ProcessTree::build(&index).to_string()
}
