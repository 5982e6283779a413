//! Header hierarchy reconstruction.
//!
//! Top-level headers come from row 0. A header whose row span stops short of
//! the last header row owns the header cells anchored in the next row inside
//! its column range, and so on down. Each grid position of the header block
//! is claimed at most once; when two header cells compete for a position the
//! one met first in column order (then input order) wins and the other is
//! reported as a conflict. A placed header whose footprint runs into
//! positions already claimed keeps its place but loses those positions, and
//! is reported as clipped.
//!
//! Work is proportional to the number of header cells, never to the declared
//! grid size.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use tracing::debug;

use super::anomaly::{ConflictReason, HeaderConflict};
use super::grid::{GridCell, GridIndex};
use crate::models::invoice::HeaderColumn;

/// Header forest of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderForest {
    /// Top-level headers in column order.
    pub roots: Vec<HeaderColumn>,
    /// Header cells that were dropped or clipped, in (row, column) order.
    pub conflicts: Vec<HeaderConflict>,
}

impl HeaderForest {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Grid positions of the header block already taken by an emitted header,
/// kept per header row as disjoint `start -> end` column intervals.
#[derive(Debug, Default)]
struct Claims {
    rows: HashMap<usize, BTreeMap<usize, usize>>,
}

impl Claims {
    fn is_claimed(&self, row: usize, column: usize) -> bool {
        self.rows
            .get(&row)
            .and_then(|spans| spans.range(..=column).next_back())
            .is_some_and(|(_, end)| column < *end)
    }

    /// Claim the cell's footprint on the header rows it reaches. Positions
    /// already taken keep their owner; returns whether there were any.
    fn claim(&mut self, index: &GridIndex<'_>, cell: &GridCell<'_>) -> bool {
        let mut collided = false;
        for &row in index.header_rows.range(cell.row..cell.row_end()).map(|(row, _)| row) {
            let spans = self.rows.entry(row).or_default();
            collided |= claim_span(spans, cell.column..cell.column_end());
        }
        collided
    }
}

/// Insert the free parts of `columns` into `spans`.
fn claim_span(spans: &mut BTreeMap<usize, usize>, columns: Range<usize>) -> bool {
    let mut free = Vec::new();
    let mut cursor = columns.start;

    if let Some((_, end)) = spans.range(..columns.start).next_back() {
        cursor = cursor.max(*end);
    }
    for (&start, &end) in spans.range(columns.clone()) {
        if start > cursor {
            free.push(cursor..start);
        }
        cursor = cursor.max(end);
    }
    if cursor < columns.end {
        free.push(cursor..columns.end);
    }

    let collided = free != [columns];
    for gap in free {
        spans.insert(gap.start, gap.end);
    }
    collided
}

/// Build the header forest for an indexed table.
pub fn build_header_forest(index: &GridIndex<'_>) -> HeaderForest {
    if !index.has_headers() {
        return HeaderForest::default();
    }

    let mut scan = Scan {
        index,
        claims: Claims::default(),
        clipped: Vec::new(),
    };
    let roots = scan.row(0, 0..index.column_count);

    let mut conflicts = unplaced_headers(index, &roots, &scan.claims);
    conflicts.append(&mut scan.clipped);
    conflicts.sort_by_key(|c| (c.row, c.column, c.cell));

    debug!(
        "Built header forest: {} top-level headers, {} conflicts",
        roots.len(),
        conflicts.len()
    );

    HeaderForest { roots, conflicts }
}

struct Scan<'i, 'a> {
    index: &'i GridIndex<'a>,
    claims: Claims,
    clipped: Vec<HeaderConflict>,
}

impl Scan<'_, '_> {
    /// Emit the headers anchored in `row` within `columns`, left to right,
    /// descending into each header's own column range.
    fn row(&mut self, row: usize, columns: Range<usize>) -> Vec<HeaderColumn> {
        let index = self.index;
        let cells = index.header_row(row);
        let mut nodes = Vec::new();
        let mut cursor = columns.start;

        while cursor < columns.end {
            // Jump over unnamed gaps straight to the next anchor.
            let next = cells.partition_point(|c| c.column < cursor);
            let Some(cell) = cells.get(next).filter(|c| c.column < columns.end) else {
                break;
            };

            if self.claims.is_claimed(row, cell.column) {
                cursor = cell.column + 1;
                continue;
            }

            if self.claims.claim(index, cell) {
                debug!(
                    "Header {:?} at ({}, {}) clipped by an earlier header",
                    cell.content, cell.row, cell.column
                );
                self.clipped.push(conflict(cell, ConflictReason::Clipped));
            }

            let mut node = HeaderColumn::new(cell.content, cell.column, cell.column_span, row);
            let child_row = cell.row_end();
            if child_row < index.header_row_count {
                node.children = self.row(child_row, cell.column..cell.column_end());
            }

            nodes.push(node);
            cursor = cell.column_end();
        }

        nodes
    }
}

fn conflict(cell: &GridCell<'_>, reason: ConflictReason) -> HeaderConflict {
    HeaderConflict {
        cell: cell.ordinal,
        row: cell.row,
        column: cell.column,
        title: cell.content.to_string(),
        reason,
    }
}

/// Header cells missing from the forest.
fn unplaced_headers(
    index: &GridIndex<'_>,
    roots: &[HeaderColumn],
    claims: &Claims,
) -> Vec<HeaderConflict> {
    fn collect(nodes: &[HeaderColumn], anchors: &mut HashSet<(usize, usize)>) {
        for node in nodes {
            anchors.insert((node.level, node.column));
            collect(&node.children, anchors);
        }
    }

    let mut emitted = HashSet::new();
    collect(roots, &mut emitted);

    // The first cell at an emitted anchor is the one that was placed.
    index
        .header_cells()
        .filter(|cell| !emitted.remove(&(cell.row, cell.column)))
        .map(|cell| {
            let reason = if claims.is_claimed(cell.row, cell.column) {
                ConflictReason::Overlap
            } else {
                ConflictReason::Orphan
            };
            conflict(cell, reason)
        })
        .collect()
}
