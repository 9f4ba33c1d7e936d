/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Preconstruction buffer for CSR builds.
//!
//! The text ingester emits relations in arbitrary order, possibly repeating
//! the same ordered vertex pair with different relation types. This buffer
//! interns vertex names to dense indices, de-duplicates edges by
//! `(source, target)` pair, and accumulates the parallel arrays the CSR
//! constructor expects.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use super::csr::{CsrGraph, EdgeProp};

/// An append-only edge-list builder with name interning and edge
/// de-duplication.
#[derive(Debug, Default)]
pub struct PreCsr {
    edges: Vec<(usize, usize)>,
    eprop: Vec<EdgeProp>,
    names: Vec<String>,
    vmap: BTreeMap<String, usize>,
    emap: HashMap<(usize, usize), usize>,
}

impl PreCsr {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a vertex name, allocating a dense index on first sight.
    pub fn insert_vertex(&mut self, name: &str) -> usize {
        if let Some(&v) = self.vmap.get(name) {
            return v;
        }
        let v = self.names.len();
        self.vmap.insert(name.to_owned(), v);
        self.names.push(name.to_owned());
        v
    }

    /// Inserts the arc `u → v`, creating both endpoints as needed.
    ///
    /// A repeated `(u, v)` pair does not create a second arc: the relation
    /// type bit is OR-ed into the existing record and the first weight
    /// wins. Returns the edge index.
    pub fn insert_edge(&mut self, u: &str, v: &str, weight: f32, rtype_idx: u32) -> usize {
        debug_assert!(rtype_idx < 32);
        let u = self.insert_vertex(u);
        let v = self.insert_vertex(v);

        let e = match self.emap.entry((u, v)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let e = self.edges.len();
                self.edges.push((u, v));
                self.eprop.push(EdgeProp { weight, rtype: 0 });
                entry.insert(e);
                e
            }
        };
        self.eprop[e].rtype |= 1 << rtype_idx;
        e
    }

    /// Returns the number of interned vertices.
    pub fn num_vertices(&self) -> usize {
        self.names.len()
    }

    /// Returns the number of distinct arcs.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Consumes the buffer, building the CSR graph and handing back the
    /// name-to-index map.
    pub fn build(self) -> (CsrGraph, BTreeMap<String, usize>) {
        let graph = CsrGraph::from_edges(self.names.len(), &self.edges, self.eprop, self.names);
        (graph, self.vmap)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dedup_and_intern() {
        let mut pre = PreCsr::new();
        let e0 = pre.insert_edge("a", "b", 2.0, 0);
        let e1 = pre.insert_edge("a", "b", 9.0, 3);
        let e2 = pre.insert_edge("b", "a", 1.0, 0);

        assert_eq!(e0, e1);
        assert_ne!(e0, e2);
        assert_eq!(pre.num_vertices(), 2);
        assert_eq!(pre.num_edges(), 2);

        let (g, vmap) = pre.build();
        assert_eq!(vmap.len(), 2);
        let a = vmap["a"];
        let b = vmap["b"];
        let (e, _) = g.out_edges(a).next().unwrap();
        assert_eq!(g.edge_target(e), b);
        // Bits merged, first weight kept.
        assert_eq!(g.edge_prop(e).rtype, 0b1001);
        assert_eq!(g.edge_prop(e).weight, 2.0);
    }
}
