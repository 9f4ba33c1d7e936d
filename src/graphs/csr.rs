/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A compressed sparse row graph with vertex and edge properties.
//!
//! The graph keeps two CSR halves: a forward half giving the out-arcs of
//! each vertex, and a backward half giving the in-arcs. Edge properties are
//! stored once, indexed by *forward* edge position; each backward arc
//! carries the index of its forward twin, so traversals over in-arcs can
//! recover the same property record.
//!
//! The representation is immutable after construction, except for the edge
//! property array (relation-type bits may be added, and weights may be
//! overwritten wholesale by
//! [`Kb::ppv_weights`](crate::engine::Kb::ppv_weights)).

use crate::traits::RandomAccessGraph;

/// Properties attached to every (forward) arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeProp {
    /// Arc weight. Finite and nonnegative; ingest coerces zero to 1.0.
    pub weight: f32,
    /// Relation-type bitset: bit `i` set means the arc carries the
    /// relation type with registry index `i`.
    pub rtype: u32,
}

impl Default for EdgeProp {
    fn default() -> Self {
        Self {
            weight: 1.0,
            rtype: 0,
        }
    }
}

/// A directed graph in compressed sparse row form, with a name per vertex
/// and an [`EdgeProp`] per arc.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrGraph {
    /// Forward degree-cumulative function; `fwd_rowstart[v]..fwd_rowstart[v + 1]`
    /// delimits the out-arcs of `v`. Always `num_nodes() + 1` entries.
    fwd_rowstart: Vec<usize>,
    /// Targets of the forward arcs.
    fwd_column: Vec<usize>,
    /// Properties of the forward arcs.
    eprop: Vec<EdgeProp>,
    /// Backward degree-cumulative function.
    bwd_rowstart: Vec<usize>,
    /// Sources of the backward arcs.
    bwd_column: Vec<usize>,
    /// For each backward arc, the index of its forward twin.
    bwd_fwd_edge: Vec<usize>,
    /// Vertex names, indexed by vertex.
    names: Vec<String>,
}

impl Default for CsrGraph {
    fn default() -> Self {
        Self {
            fwd_rowstart: vec![0],
            fwd_column: vec![],
            eprop: vec![],
            bwd_rowstart: vec![0],
            bwd_column: vec![],
            bwd_fwd_edge: vec![],
            names: vec![],
        }
    }
}

impl CsrGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds both CSR halves from an unsorted edge list.
    ///
    /// `eprop[i]` is the property record of `edges[i]`; `names[v]` is the
    /// name of vertex `v`. The forward half is produced by counting sort
    /// on sources, the backward half by counting sort on targets; the
    /// backward payload records the permutation.
    ///
    /// # Panics
    ///
    /// Panics if the property or name arrays do not match the edge list,
    /// or if an endpoint is out of range.
    pub fn from_edges(
        num_vertices: usize,
        edges: &[(usize, usize)],
        eprop: Vec<EdgeProp>,
        names: Vec<String>,
    ) -> Self {
        let n = num_vertices;
        let m = edges.len();
        assert_eq!(eprop.len(), m, "one property record per edge");
        assert_eq!(names.len(), n, "one name per vertex");

        let mut fwd_rowstart = vec![0usize; n + 1];
        for &(u, v) in edges {
            assert!(u < n && v < n, "edge endpoint out of range");
            fwd_rowstart[u + 1] += 1;
        }
        for i in 0..n {
            fwd_rowstart[i + 1] += fwd_rowstart[i];
        }

        let mut cursor = fwd_rowstart.clone();
        let mut fwd_column = vec![0usize; m];
        // Forward slot of each input edge; reused to fill the backward payload.
        let mut fwd_slot = vec![0usize; m];
        for (i, &(u, v)) in edges.iter().enumerate() {
            let slot = cursor[u];
            cursor[u] += 1;
            fwd_column[slot] = v;
            fwd_slot[i] = slot;
        }
        let mut fwd_prop = vec![EdgeProp::default(); m];
        for (i, p) in eprop.into_iter().enumerate() {
            fwd_prop[fwd_slot[i]] = p;
        }

        let mut bwd_rowstart = vec![0usize; n + 1];
        for &(_, v) in edges {
            bwd_rowstart[v + 1] += 1;
        }
        for i in 0..n {
            bwd_rowstart[i + 1] += bwd_rowstart[i];
        }

        let mut cursor = bwd_rowstart.clone();
        let mut bwd_column = vec![0usize; m];
        let mut bwd_fwd_edge = vec![0usize; m];
        for (i, &(u, v)) in edges.iter().enumerate() {
            let slot = cursor[v];
            cursor[v] += 1;
            bwd_column[slot] = u;
            bwd_fwd_edge[slot] = fwd_slot[i];
        }

        Self {
            fwd_rowstart,
            fwd_column,
            eprop: fwd_prop,
            bwd_rowstart,
            bwd_column,
            bwd_fwd_edge,
            names,
        }
    }

    /// Assembles a graph directly from its arrays, without rebuilding.
    ///
    /// Used by the snapshot reader.
    ///
    /// # Safety
    ///
    /// The row-start arrays must be monotone with `num_nodes() + 1` entries,
    /// the column arrays must hold in-range vertices, the backward payload
    /// must be a permutation of the forward edge indices consistent with the
    /// endpoints, and the property and name arrays must match the edge and
    /// vertex counts.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn from_parts(
        fwd_rowstart: Vec<usize>,
        fwd_column: Vec<usize>,
        eprop: Vec<EdgeProp>,
        bwd_rowstart: Vec<usize>,
        bwd_column: Vec<usize>,
        bwd_fwd_edge: Vec<usize>,
        names: Vec<String>,
    ) -> Self {
        Self {
            fwd_rowstart,
            fwd_column,
            eprop,
            bwd_rowstart,
            bwd_column,
            bwd_fwd_edge,
            names,
        }
    }

    /// Returns the indegree of a vertex.
    #[inline(always)]
    pub fn indegree(&self, node: usize) -> usize {
        self.bwd_rowstart[node + 1] - self.bwd_rowstart[node]
    }

    /// Returns the out-arcs of a vertex as `(forward edge index, target)` pairs.
    #[inline(always)]
    pub fn out_edges(&self, node: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.fwd_rowstart[node]..self.fwd_rowstart[node + 1]).map(|e| (e, self.fwd_column[e]))
    }

    /// Returns the in-arcs of a vertex as `(forward edge index, source)` pairs.
    ///
    /// The edge index points at the forward twin of each in-arc, so
    /// [`edge_prop`](Self::edge_prop) returns the property record of the
    /// original arc.
    #[inline(always)]
    pub fn in_edges(&self, node: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let start = self.bwd_rowstart[node];
        let end = self.bwd_rowstart[node + 1];
        self.bwd_fwd_edge[start..end]
            .iter()
            .copied()
            .zip(self.bwd_column[start..end].iter().copied())
    }

    /// Returns the property record of a forward edge.
    #[inline(always)]
    pub fn edge_prop(&self, edge: usize) -> &EdgeProp {
        &self.eprop[edge]
    }

    #[inline(always)]
    pub(crate) fn edge_prop_mut(&mut self, edge: usize) -> &mut EdgeProp {
        &mut self.eprop[edge]
    }

    /// Returns the target vertex of a forward edge.
    #[inline(always)]
    pub fn edge_target(&self, edge: usize) -> usize {
        self.fwd_column[edge]
    }

    /// Returns the name of a vertex.
    #[inline(always)]
    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    /// Returns the vertex name array.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the forward degree-cumulative function.
    pub fn forward_rowstart(&self) -> &[usize] {
        &self.fwd_rowstart
    }

    /// Returns the forward column (target) array.
    pub fn forward_column(&self) -> &[usize] {
        &self.fwd_column
    }

    /// Returns the backward degree-cumulative function.
    pub fn backward_rowstart(&self) -> &[usize] {
        &self.bwd_rowstart
    }

    /// Returns the backward column (source) array.
    pub fn backward_column(&self) -> &[usize] {
        &self.bwd_column
    }

    /// Returns the backward-to-forward edge permutation.
    pub fn backward_to_forward(&self) -> &[usize] {
        &self.bwd_fwd_edge
    }

    /// Returns the edge property array, indexed by forward edge.
    pub fn edge_props(&self) -> &[EdgeProp] {
        &self.eprop
    }
}

impl RandomAccessGraph for CsrGraph {
    type Successors<'a>
        = std::iter::Copied<std::slice::Iter<'a, usize>>
    where
        Self: 'a;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.fwd_rowstart.len().saturating_sub(1)
    }

    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.fwd_column.len() as u64
    }

    #[inline(always)]
    fn successors(&self, node: usize) -> Self::Successors<'_> {
        self.fwd_column[self.fwd_rowstart[node]..self.fwd_rowstart[node + 1]]
            .iter()
            .copied()
    }

    #[inline(always)]
    fn outdegree(&self, node: usize) -> usize {
        self.fwd_rowstart[node + 1] - self.fwd_rowstart[node]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("v{i}")).collect()
    }

    #[test]
    fn test_both_halves() {
        let arcs = vec![(0, 1), (0, 2), (1, 2), (2, 0), (3, 2)];
        let props: Vec<EdgeProp> = (0..arcs.len())
            .map(|i| EdgeProp {
                weight: i as f32 + 1.0,
                rtype: 1 << i,
            })
            .collect();
        let g = CsrGraph::from_edges(4, &arcs, props, names(4));

        assert_eq!(g.num_nodes(), 4);
        assert_eq!(g.num_arcs(), 5);
        assert_eq!(g.successors(0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(g.outdegree(3), 1);
        assert_eq!(g.indegree(2), 3);
        assert!(g.has_arc(2, 0));
        assert!(!g.has_arc(0, 3));

        // Every in-arc of 2 recovers the property record of its forward twin.
        for (e, src) in g.in_edges(2) {
            assert_eq!(g.edge_target(e), 2);
            let i = arcs.iter().position(|&(u, v)| u == src && v == 2).unwrap();
            assert_eq!(g.edge_prop(e).weight, i as f32 + 1.0);
        }
    }

    #[test]
    fn test_empty() {
        let g = CsrGraph::new();
        assert_eq!(g.num_nodes(), 0);
        assert_eq!(g.num_arcs(), 0);
    }
}
