/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Binary snapshot codec.
//!
//! A snapshot is a flat stream of length-prefixed primitives punctuated by
//! magic section markers. The layout, in order: magic; relation-source
//! set; relation-type sequence; vertex-name map; magic; edge count; vertex
//! count; magic; forward row starts; forward columns; backward row starts;
//! backward columns; backward-to-forward edge payload; one name string per
//! vertex; one `(weight, rtype)` record per edge; magic; notes.
//!
//! The format is validated only by the magic markers. Two legacy magics
//! are recognized and rejected with a message pointing at the offline
//! conversion utility.

pub(crate) mod atoms;

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use crate::error::KbError;
use crate::graphs::csr::{CsrGraph, EdgeProp};
use crate::traits::RandomAccessGraph;
use atoms::*;

/// Section marker of the current snapshot format.
pub const MAGIC: u64 = 0x110501;
/// Magic of the first-generation serialization; rejected.
pub const LEGACY_MAGIC_V1: u64 = 0x070201;
/// Magic of the second-generation serialization; rejected.
pub const LEGACY_MAGIC_V2: u64 = 0x080826;

/// Everything a snapshot persists.
pub(crate) struct SnapshotContents {
    pub(crate) graph: CsrGraph,
    pub(crate) synset_map: BTreeMap<String, usize>,
    pub(crate) rtypes: Vec<String>,
    pub(crate) sources: BTreeSet<String>,
    pub(crate) notes: Vec<String>,
    pub(crate) vertex_n: usize,
    pub(crate) edge_n: usize,
}

/// A borrowed view of the engine state that a snapshot persists.
pub(crate) struct SnapshotView<'a> {
    pub(crate) graph: &'a CsrGraph,
    pub(crate) synset_map: &'a BTreeMap<String, usize>,
    pub(crate) rtypes: &'a [String],
    pub(crate) sources: &'a BTreeSet<String>,
    pub(crate) notes: &'a [String],
    pub(crate) vertex_n: usize,
    pub(crate) edge_n: usize,
}

fn expect_magic<R: Read>(reader: &mut R, context: &'static str) -> Result<(), KbError> {
    let found = read_word(reader, context)?;
    if found == MAGIC {
        return Ok(());
    }
    if found == LEGACY_MAGIC_V1 || found == LEGACY_MAGIC_V2 {
        return Err(KbError::LegacyMagic);
    }
    Err(KbError::BadMagic { found, context })
}

fn invalid(msg: &str) -> KbError {
    KbError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
}

/// Reads a snapshot, checking the structural invariants the graph
/// constructor relies on.
pub(crate) fn read_stream<R: Read>(mut reader: R) -> Result<SnapshotContents, KbError> {
    let reader = &mut reader;
    expect_magic(reader, "header")?;

    let sources = read_string_set(reader, "relation sources")?;
    let rtypes = read_string_seq(reader, "relation types")?;
    let synset_map = read_string_map(reader, "vertex map")?;

    expect_magic(reader, "maps")?;

    let edge_n = read_word(reader, "graph sizes")? as usize;
    let vertex_n = read_word(reader, "graph sizes")? as usize;

    expect_magic(reader, "graph sizes")?;

    let fwd_rowstart = read_index_seq(reader, "forward row starts")?;
    let fwd_column = read_index_seq(reader, "forward columns")?;
    let bwd_rowstart = read_index_seq(reader, "backward row starts")?;
    let bwd_column = read_index_seq(reader, "backward columns")?;
    let bwd_fwd_edge = read_index_seq(reader, "backward edge payload")?;

    let mut names = Vec::with_capacity(vertex_n);
    for _ in 0..vertex_n {
        names.push(read_string(reader, "vertex names")?);
    }

    let mut eprop = Vec::with_capacity(edge_n);
    for _ in 0..edge_n {
        let weight = read_f32(reader, "edge properties")?;
        let rtype = read_u32(reader, "edge properties")?;
        eprop.push(EdgeProp { weight, rtype });
    }

    expect_magic(reader, "graph")?;

    let notes = read_string_seq(reader, "notes")?;

    // Structural checks before handing the arrays to the graph.
    if fwd_rowstart.len() != vertex_n + 1 || bwd_rowstart.len() != vertex_n + 1 {
        return Err(invalid("row-start arrays do not match the vertex count"));
    }
    for rowstart in [&fwd_rowstart, &bwd_rowstart] {
        if rowstart.windows(2).any(|w| w[0] > w[1]) {
            return Err(invalid("row-start array is not nondecreasing"));
        }
        if *rowstart.last().expect("row-start arrays are never empty") != edge_n {
            return Err(invalid("row-start array does not match the edge count"));
        }
    }
    if fwd_column.len() != edge_n || bwd_column.len() != edge_n || bwd_fwd_edge.len() != edge_n {
        return Err(invalid("edge arrays do not match the edge count"));
    }
    if fwd_column.iter().chain(bwd_column.iter()).any(|&v| v >= vertex_n) {
        return Err(invalid("edge endpoint out of range"));
    }
    if bwd_fwd_edge.iter().any(|&e| e >= edge_n) {
        return Err(invalid("backward edge payload out of range"));
    }
    if synset_map.len() != vertex_n {
        return Err(invalid("vertex map does not match the vertex count"));
    }

    // SAFETY: validated just above.
    let graph = unsafe {
        CsrGraph::from_parts(
            fwd_rowstart,
            fwd_column,
            eprop,
            bwd_rowstart,
            bwd_column,
            bwd_fwd_edge,
            names,
        )
    };

    Ok(SnapshotContents {
        graph,
        synset_map,
        rtypes,
        sources,
        notes,
        vertex_n,
        edge_n,
    })
}

/// Writes a snapshot.
///
/// # Panics
///
/// Panics if the recorded vertex and edge counts disagree with the CSR
/// sizes.
pub(crate) fn write_stream<W: Write>(mut writer: W, view: &SnapshotView) -> Result<(), KbError> {
    let writer = &mut writer;
    let graph = view.graph;

    assert_eq!(view.vertex_n, graph.num_nodes());
    assert_eq!(view.edge_n, graph.num_arcs() as usize);

    write_word(writer, MAGIC)?;

    write_string_set(writer, view.sources)?;
    write_string_seq(writer, view.rtypes)?;
    write_string_map(writer, view.synset_map)?;

    write_word(writer, MAGIC)?;

    write_word(writer, view.edge_n as u64)?;
    write_word(writer, view.vertex_n as u64)?;

    write_word(writer, MAGIC)?;

    write_index_seq(writer, graph.forward_rowstart())?;
    write_index_seq(writer, graph.forward_column())?;
    write_index_seq(writer, graph.backward_rowstart())?;
    write_index_seq(writer, graph.backward_column())?;
    write_index_seq(writer, graph.backward_to_forward())?;

    for name in graph.names() {
        write_string(writer, name)?;
    }

    for prop in graph.edge_props() {
        write_f32(writer, prop.weight)?;
        write_u32(writer, prop.rtype)?;
    }

    write_word(writer, MAGIC)?;

    write_string_seq(writer, view.notes)?;
    Ok(())
}
