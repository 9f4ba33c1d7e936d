/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The knowledge-base engine façade.
//!
//! A [`Kb`] owns a loaded graph together with its registries and caches,
//! and answers every query of the toolkit: vertex lookup, traversals,
//! bounded subgraph extraction, personalized PageRank, and serialization
//! in both text and binary form.
//!
//! Engines are created by explicit factory constructors
//! ([`Kb::from_text_path`], [`Kb::from_binary_path`] and their
//! reader/stream variants). A thin process-wide default-instance slot is
//! kept at the module level for callers that want the classical
//! load-once-query-everywhere lifecycle: [`create_from_txt`] and
//! [`create_from_binfile`] populate the slot on first call and are no-ops
//! thereafter, and [`instance`] returns the loaded engine or fails with
//! [`KbError::NotInitialized`]. There is no unload operation.
//!
//! A graph is populated exactly once and then queried. The only mutating
//! operations are [`add_comment`](Kb::add_comment),
//! [`add_rel_source`](Kb::add_rel_source),
//! [`edge_add_reltype`](Kb::edge_add_reltype) and
//! [`ppv_weights`](Kb::ppv_weights), which require an owned (or uniquely
//! borrowed) engine and are therefore not reachable through the shared
//! default instance. PageRank memoization happens behind interior
//! mutability of the cache slots only, so ranking queries work on `&Kb`.
//!
//! The engine assumes single-threaded access: no operation suspends or
//! blocks except on synchronous I/O, and callers that share an engine
//! across threads must provide their own mutual exclusion around the
//! mutating operations.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::ops::ControlFlow::{Break, Continue};
use std::path::Path;
use std::sync::OnceLock;

use dsi_progress_logger::no_logging;
use no_break::NoBreak;
use rand::Rng;

use crate::distances;
use crate::error::KbError;
use crate::graphs::csr::CsrGraph;
use crate::ingest;
use crate::rank::pagerank::{stop, PageRank};
use crate::settings::KbSettings;
use crate::snapshot::{self, SnapshotView};
use crate::traits::RandomAccessGraph;
use crate::visits::breadth_first::{EventPred, Seq};
use crate::visits::{Sequential, StoppedWhenDone};

/// A loaded knowledge base.
#[derive(Debug)]
pub struct Kb {
    graph: CsrGraph,
    vertex_n: usize,
    edge_n: usize,
    /// Name-to-vertex mapping.
    synset_map: BTreeMap<String, usize>,
    /// Relation-type registry, in registration order.
    rtypes: Vec<String>,
    /// Relation provenance tags seen on ingest.
    rels_source: BTreeSet<String>,
    /// Free-text annotations attached to the graph.
    notes: Vec<String>,
    settings: KbSettings,
    /// Per-vertex PageRank normalizers, computed on the first ranking
    /// query and reused until the graph is reloaded.
    out_coefs: OnceLock<Box<[f64]>>,
    /// Memoized PageRank with uniform personalization.
    static_ppv: OnceLock<Box<[f64]>>,
}

impl Kb {
    fn assemble(
        graph: CsrGraph,
        synset_map: BTreeMap<String, usize>,
        rtypes: Vec<String>,
        rels_source: BTreeSet<String>,
        notes: Vec<String>,
        settings: KbSettings,
    ) -> Self {
        let vertex_n = graph.num_nodes();
        let edge_n = graph.num_arcs() as usize;
        Self {
            graph,
            vertex_n,
            edge_n,
            synset_map,
            rtypes,
            rels_source,
            notes,
            settings,
            out_coefs: OnceLock::new(),
            static_ppv: OnceLock::new(),
        }
    }

    /// Loads a knowledge base from a relation stream in the
    /// [text format](crate::ingest).
    ///
    /// When `settings.filter_src` is set, only relations whose provenance
    /// tag is in `src_allowed` are ingested.
    pub fn from_text_reader<R: BufRead>(
        reader: R,
        settings: KbSettings,
        src_allowed: &BTreeSet<String>,
    ) -> Result<Self, KbError> {
        let relations = ingest::read_relations(reader, &settings, src_allowed, no_logging![])?;
        let (graph, synset_map) = relations.pre.build();
        Ok(Self::assemble(
            graph,
            synset_map,
            relations.rtypes,
            relations.sources,
            Vec::new(),
            settings,
        ))
    }

    /// Loads a knowledge base from a relation file in the
    /// [text format](crate::ingest).
    pub fn from_text_path(
        path: impl AsRef<Path>,
        settings: KbSettings,
        src_allowed: &BTreeSet<String>,
    ) -> Result<Self, KbError> {
        if settings.v1_kb {
            return Err(KbError::LegacyMagic);
        }
        let file = File::open(path)?;
        Self::from_text_reader(BufReader::new(file), settings, src_allowed)
    }

    /// Loads a knowledge base from a binary snapshot stream.
    pub fn from_stream<R: Read>(reader: R, settings: KbSettings) -> Result<Self, KbError> {
        let contents = snapshot::read_stream(reader)?;
        debug_assert_eq!(contents.vertex_n, contents.graph.num_nodes());
        debug_assert_eq!(contents.edge_n, contents.graph.num_arcs() as usize);
        Ok(Self::assemble(
            contents.graph,
            contents.synset_map,
            contents.rtypes,
            contents.sources,
            contents.notes,
            settings,
        ))
    }

    /// Loads a knowledge base from a binary snapshot file.
    pub fn from_binary_path(path: impl AsRef<Path>, settings: KbSettings) -> Result<Self, KbError> {
        let file = File::open(path)?;
        Self::from_stream(BufReader::new(file), settings)
    }

    /// Returns the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertex_n
    }

    /// Returns the number of directed arcs.
    pub fn num_edges(&self) -> usize {
        self.edge_n
    }

    /// Returns the underlying CSR graph.
    pub fn graph(&self) -> &CsrGraph {
        &self.graph
    }

    /// Returns the settings the engine was created with.
    pub fn settings(&self) -> &KbSettings {
        &self.settings
    }

    /// Returns the vertex with the given name, if any.
    pub fn get_vertex_by_name(&self, name: &str) -> Option<usize> {
        self.synset_map.get(name).copied()
    }

    /// Returns the relation-type registry, in registration order.
    pub fn relation_types(&self) -> &[String] {
        &self.rtypes
    }

    /// Returns the relation provenance tags.
    pub fn relation_sources(&self) -> &BTreeSet<String> {
        &self.rels_source
    }

    /// Returns the notes attached to the graph.
    pub fn get_comments(&self) -> &[String] {
        &self.notes
    }

    /// Appends a free-text note.
    pub fn add_comment(&mut self, note: &str) {
        self.notes.push(note.to_owned());
    }

    /// Registers a relation provenance tag.
    pub fn add_rel_source(&mut self, source: &str) {
        self.rels_source.insert(source.to_owned());
    }

    /// Expands the relation-type bitset of an edge into names, in
    /// registration order.
    pub fn get_edge_reltypes(&self, edge: usize) -> Vec<&str> {
        let mut res = Vec::new();
        if self.rtypes.is_empty() {
            return res;
        }
        let mask = self.graph.edge_prop(edge).rtype;
        for (idx, name) in self.rtypes.iter().enumerate() {
            if mask & (1 << idx) != 0 {
                res.push(name.as_str());
            }
        }
        res
    }

    /// Adds a relation type to an edge, registering the name if new.
    pub fn edge_add_reltype(&mut self, edge: usize, rel: &str) -> Result<(), KbError> {
        let idx = ingest::reltype_index(&mut self.rtypes, rel)?;
        self.graph.edge_prop_mut(edge).rtype |= 1 << idx;
        Ok(())
    }

    /// Picks a vertex uniformly at random; `None` on the empty graph.
    pub fn get_random_vertex<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        if self.vertex_n == 0 {
            None
        } else {
            Some(rng.random_range(0..self.vertex_n))
        }
    }

    /// Returns the minimum and maximum indegree; `None` on the empty graph.
    pub fn indeg_maxmin(&self) -> Option<(usize, usize)> {
        self.degree_maxmin(|v| self.graph.indegree(v))
    }

    /// Returns the minimum and maximum outdegree; `None` on the empty
    /// graph.
    pub fn outdeg_maxmin(&self) -> Option<(usize, usize)> {
        self.degree_maxmin(|v| self.graph.outdegree(v))
    }

    fn degree_maxmin(&self, degree: impl Fn(usize) -> usize) -> Option<(usize, usize)> {
        (0..self.vertex_n).map(degree).fold(None, |acc, d| {
            Some(match acc {
                None => (d, d),
                Some((min, max)) => (min.min(d), max.max(d)),
            })
        })
    }

    /// Breadth-first search from `src`, capturing predecessors.
    ///
    /// Fills `parents` with `parents[src] == src`, `parents[v] == u` when
    /// `u` is the BFS predecessor of `v`, and `parents[v] == v` for
    /// unreached vertices. Storage is reused when already sized to the
    /// number of vertices.
    ///
    /// # Panics
    ///
    /// Panics if `src` is not a vertex.
    pub fn bfs(&self, src: usize, parents: &mut Vec<usize>) {
        Self::reset_parents(parents, self.vertex_n);
        let mut visit = Seq::new(&self.graph);
        visit
            .visit([src], |event| {
                if let EventPred::Discover { node, pred, .. } = event {
                    parents[node] = pred;
                }
                Continue(())
            })
            .continue_value_no_break();
    }

    /// Dijkstra shortest paths from `src`, using edge weights as costs.
    ///
    /// Same predecessor-map convention and storage reuse as
    /// [`bfs`](Self::bfs).
    ///
    /// # Panics
    ///
    /// Panics if `src` is not a vertex.
    pub fn dijkstra(&self, src: usize, parents: &mut Vec<usize>) {
        distances::dijkstra(&self.graph, src, parents);
    }

    fn reset_parents(parents: &mut Vec<usize>, n: usize) {
        if parents.len() == n {
            parents
                .iter_mut()
                .enumerate()
                .for_each(|(v, parent)| *parent = v);
        } else {
            *parents = (0..n).collect();
        }
    }

    /// Extracts the subgraph grown breadth-first from the vertex named
    /// `src`, admitting vertices in discovery order until `limit` are
    /// admitted.
    ///
    /// Returns the admitted vertex names and, for each admitted vertex,
    /// the names of its successors within the subgraph. Arcs are reported
    /// as traversed: a tree arc records its target under its source and,
    /// when the reverse arc exists in the graph, the source under the
    /// target as well; a non-tree arc between admitted vertices records
    /// its target under its source. Arcs pointing outside the admitted
    /// set are dropped.
    ///
    /// An unknown source name or a zero limit yields an empty subgraph.
    pub fn get_subgraph(&self, src: &str, limit: usize) -> (Vec<String>, Vec<Vec<String>>) {
        let Some(root) = self.get_vertex_by_name(src) else {
            return (Vec::new(), Vec::new());
        };
        if limit == 0 {
            return (Vec::new(), Vec::new());
        }

        let mut verts = vec![root];
        let mut index = HashMap::from([(root, 0usize)]);
        let mut adj: Vec<Vec<usize>> = vec![Vec::new()];

        let mut visit = Seq::new(&self.graph);
        // Both outcomes are fine: either the visit ran out of graph, or it
        // broke with the sentinel once the vertex cap was reached.
        let _ = visit.visit([root], |event| {
            match event {
                EventPred::Discover { distance: 0, .. } => {} // the root
                EventPred::Discover { node, pred, .. } => {
                    if verts.len() == limit {
                        return Break(StoppedWhenDone);
                    }
                    let v_i = verts.len();
                    verts.push(node);
                    index.insert(node, v_i);
                    adj.push(Vec::new());
                    let u_i = index[&pred];
                    adj[u_i].push(node);
                    // The reverse arc, if present, will not be traversed as
                    // a tree arc.
                    if self.graph.has_arc(node, pred) {
                        adj[v_i].push(pred);
                    }
                }
                EventPred::Revisit { node, pred } => {
                    if let (Some(&u_i), Some(_)) = (index.get(&pred), index.get(&node)) {
                        adj[u_i].push(node);
                    }
                }
                _ => {}
            }
            Continue(())
        });

        let names = verts.iter().map(|&v| self.graph.name(v).to_owned()).collect();
        let edges = adj
            .into_iter()
            .map(|row| row.into_iter().map(|v| self.graph.name(v).to_owned()).collect())
            .collect();
        (names, edges)
    }

    /// Returns the per-vertex PageRank normalizers, computing them on
    /// first use: the sum of out-arc weights in weighted mode, the
    /// outdegree otherwise. Dangling vertices have coefficient 0.
    fn out_coefs(&self) -> &[f64] {
        self.out_coefs.get_or_init(|| {
            let n = self.vertex_n;
            let mut coefs = vec![0.0; n];
            if self.settings.prank.use_weight {
                for (u, coef) in coefs.iter_mut().enumerate() {
                    for (edge, _) in self.graph.out_edges(u) {
                        *coef += self.graph.edge_prop(edge).weight as f64;
                    }
                }
            } else {
                for (u, coef) in coefs.iter_mut().enumerate() {
                    *coef = self.graph.outdegree(u) as f64;
                }
            }
            coefs.into_boxed_slice()
        })
    }

    /// Computes personalized PageRank with teleportation vector `ppv`.
    ///
    /// `ppv` must sum to 1; the engine does not normalize it. The result
    /// is stored in `ranks`, whose storage is reused when already sized to
    /// the number of vertices. Damping, iteration cap, convergence
    /// threshold and the weighted/unweighted switch come from the engine
    /// [settings](crate::settings::PrankSettings).
    ///
    /// # Panics
    ///
    /// Panics if `ppv` is not sized to the number of vertices, or if the
    /// configured threshold or damping factor is out of range.
    pub fn pagerank_ppv(&self, ppv: &[f64], ranks: &mut Vec<f64>) {
        let n = self.vertex_n;
        assert_eq!(
            ppv.len(),
            n,
            "Personalization vector length ({}) does not match the number of vertices ({n})",
            ppv.len()
        );
        if ranks.len() == n {
            ranks.fill(0.0);
        } else {
            ranks.clear();
            ranks.resize(n, 0.0);
        }
        if n == 0 {
            return;
        }

        let prank = &self.settings.prank;
        let mut pr = PageRank::new(&self.graph, self.out_coefs(), prank.use_weight);
        pr.alpha(prank.damping).preference(Some(ppv));
        pr.run(stop::Stop::new(prank.threshold, prank.num_iterations));
        ranks.copy_from_slice(pr.rank());
    }

    /// Returns the memoized PageRank with uniform personalization,
    /// computing it on first call. Empty on the empty graph.
    pub fn static_prank(&self) -> &[f64] {
        self.static_ppv.get_or_init(|| {
            let n = self.vertex_n;
            if n == 0 {
                return Box::default();
            }
            let ppv = vec![1.0 / n as f64; n];
            let mut ranks = Vec::new();
            self.pagerank_ppv(&ppv, &mut ranks);
            ranks.into_boxed_slice()
        })
    }

    /// Overwrites every edge weight with the rank of its target vertex.
    ///
    /// Note that the cached PageRank normalizers are *not* recomputed:
    /// they are fixed on first use until the graph is reloaded.
    ///
    /// # Panics
    ///
    /// Panics if `ppv` is not sized to the number of vertices.
    pub fn ppv_weights(&mut self, ppv: &[f64]) {
        assert_eq!(ppv.len(), self.vertex_n);
        for edge in 0..self.edge_n {
            let target = self.graph.edge_target(edge);
            self.graph.edge_prop_mut(edge).weight = ppv[target] as f32;
        }
    }

    /// Pairs a rank vector with the vertex names.
    pub fn ranks_with_names<'a>(&'a self, ranks: &[f64]) -> Vec<(f64, &'a str)> {
        ranks
            .iter()
            .zip(self.graph.names())
            .map(|(&rank, name)| (rank, name.as_str()))
            .collect()
    }

    /// Writes a human-readable summary of the knowledge base.
    pub fn display_info<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(
            writer,
            "Relation sources: {}",
            join(self.rels_source.iter())
        )?;
        if !self.notes.is_empty() {
            writeln!(writer, "Notes: {}", join(self.notes.iter()))?;
        }
        writeln!(
            writer,
            "{} vertices and {} edges.\n(Note that if the graph is undirected you should divide the edge number by 2)",
            self.vertex_n, self.edge_n
        )?;
        if !self.rtypes.is_empty() {
            writeln!(writer, "Relations: {}", join(self.rtypes.iter()))?;
        }
        Ok(())
    }

    /// Dumps the whole graph: every vertex followed by its out-arcs with
    /// relation types and weights.
    pub fn dump_graph<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(
            writer,
            "Sources: {}",
            join(self.rels_source.iter())
        )?;
        for u in 0..self.vertex_n {
            writeln!(writer, "{}", self.graph.name(u))?;
            for (edge, v) in self.graph.out_edges(u) {
                writeln!(
                    writer,
                    "  [{}] {} ({})",
                    self.get_edge_reltypes(edge).join(","),
                    self.graph.name(v),
                    self.graph.edge_prop(edge).weight
                )?;
            }
        }
        Ok(())
    }

    /// Writes the graph in the text format, one `u:<name> v:<name> d:1`
    /// line per arc.
    pub fn write_to_textstream<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for u in 0..self.vertex_n {
            for (_, v) in self.graph.out_edges(u) {
                writeln!(
                    writer,
                    "u:{} v:{} d:1",
                    self.graph.name(u),
                    self.graph.name(v)
                )?;
            }
        }
        Ok(())
    }

    /// Writes the graph in the text format to a file.
    pub fn write_to_textfile(&self, path: impl AsRef<Path>) -> Result<(), KbError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to_textstream(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes a binary snapshot.
    pub fn write_to_stream<W: Write>(&self, writer: W) -> Result<(), KbError> {
        snapshot::write_stream(
            writer,
            &SnapshotView {
                graph: &self.graph,
                synset_map: &self.synset_map,
                rtypes: &self.rtypes,
                sources: &self.rels_source,
                notes: &self.notes,
                vertex_n: self.vertex_n,
                edge_n: self.edge_n,
            },
        )
    }

    /// Writes a binary snapshot to a file.
    pub fn write_to_binfile(&self, path: impl AsRef<Path>) -> Result<(), KbError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to_stream(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

static INSTANCE: OnceLock<Kb> = OnceLock::new();

/// Populates the process-wide default instance from a text relation file.
///
/// First wins: if an instance is already loaded, this is a no-op returning
/// the existing instance.
pub fn create_from_txt(
    path: impl AsRef<Path>,
    settings: KbSettings,
    src_allowed: &BTreeSet<String>,
) -> Result<&'static Kb, KbError> {
    if let Some(kb) = INSTANCE.get() {
        return Ok(kb);
    }
    let kb = Kb::from_text_path(path, settings, src_allowed)?;
    Ok(INSTANCE.get_or_init(|| kb))
}

/// Populates the process-wide default instance from a binary snapshot.
///
/// First wins: if an instance is already loaded, this is a no-op returning
/// the existing instance.
pub fn create_from_binfile(
    path: impl AsRef<Path>,
    settings: KbSettings,
) -> Result<&'static Kb, KbError> {
    if let Some(kb) = INSTANCE.get() {
        return Ok(kb);
    }
    let kb = Kb::from_binary_path(path, settings)?;
    Ok(INSTANCE.get_or_init(|| kb))
}

/// Returns the process-wide default instance.
pub fn instance() -> Result<&'static Kb, KbError> {
    INSTANCE.get().ok_or(KbError::NotInitialized)
}
