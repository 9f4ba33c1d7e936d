/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Single-source shortest paths over the weighted CSR graph.

use crate::graphs::csr::CsrGraph;
use crate::traits::RandomAccessGraph;
use dary_heap::QuaternaryHeap;

/// Heap entry; the comparison is reversed, so the heap is a min-heap.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Head {
    dist: f64,
    node: usize,
}

impl Eq for Head {}

impl PartialOrd for Head {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Dijkstra shortest paths from `src`, using edge weights as nonnegative
/// costs.
///
/// Fills `parents` with the predecessor map: `parents[src] == src`, and
/// `parents[v] == v` for unreachable `v`. Storage is reused when already
/// sized to the number of vertices.
///
/// Stale heap entries are skipped on extraction against a scratch distance
/// array, which is the textbook substitute for a decrease-key operation.
pub fn dijkstra(graph: &CsrGraph, src: usize, parents: &mut Vec<usize>) {
    let n = graph.num_nodes();
    if parents.len() == n {
        parents
            .iter_mut()
            .enumerate()
            .for_each(|(v, parent)| *parent = v);
    } else {
        *parents = (0..n).collect();
    }

    let mut dist = vec![f64::INFINITY; n];
    let mut heap = QuaternaryHeap::new();
    dist[src] = 0.0;
    heap.push(Head {
        dist: 0.0,
        node: src,
    });

    while let Some(Head { dist: d, node }) = heap.pop() {
        if d > dist[node] {
            continue; // stale entry
        }
        for (edge, succ) in graph.out_edges(node) {
            let next = d + graph.edge_prop(edge).weight as f64;
            if next < dist[succ] {
                dist[succ] = next;
                parents[succ] = node;
                heap.push(Head {
                    dist: next,
                    node: succ,
                });
            }
        }
    }
}
