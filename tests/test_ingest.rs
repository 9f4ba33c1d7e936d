/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::collections::BTreeSet;
use std::io::Cursor;

use kbgraph::prelude::*;

fn load(text: &str) -> Kb {
    Kb::from_text_reader(Cursor::new(text), KbSettings::default(), &BTreeSet::new()).unwrap()
}

fn load_with(text: &str, settings: KbSettings, allowed: &[&str]) -> Kb {
    let allowed: BTreeSet<String> = allowed.iter().map(|s| s.to_string()).collect();
    Kb::from_text_reader(Cursor::new(text), settings, &allowed).unwrap()
}

/// Checks the structural invariants that must hold after any successful
/// load.
fn check_invariants(kb: &Kb) {
    let g = kb.graph();
    let n = kb.num_vertices();
    let m = kb.num_edges();

    assert_eq!(g.num_nodes(), n);
    assert_eq!(g.num_arcs() as usize, m);
    assert_eq!(g.names().len(), n);

    // Every name maps to a vertex whose stored name equals the key.
    for v in 0..n {
        assert_eq!(kb.get_vertex_by_name(g.name(v)), Some(v));
    }

    for rowstart in [g.forward_rowstart(), g.backward_rowstart()] {
        assert_eq!(rowstart.len(), n + 1);
        assert!(rowstart.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*rowstart.last().unwrap(), m);
    }

    // For every forward arc u → v there is a backward arc whose payload
    // points back at it, with endpoints swapped.
    for v in 0..n {
        for (edge, src) in g.in_edges(v) {
            assert_eq!(g.edge_target(edge), v);
            assert!(g.has_arc(src, v));
        }
    }

    for u in 0..n {
        // No self-loops.
        assert!(g.successors(u).all(|succ| succ != u));
    }

    // Every relation-type bit refers to an in-range registry index (only
    // meaningful when retention is on and at least one type was seen).
    if !kb.relation_types().is_empty() {
        let top = kb.relation_types().len();
        for prop in g.edge_props() {
            assert_eq!(prop.rtype >> top, 0);
        }
    }
}

#[test]
fn test_two_edge_undirected() {
    let kb = load("u:a v:b w:2.0\nu:b v:c\n");
    check_invariants(&kb);
    assert_eq!(kb.num_vertices(), 3);
    assert_eq!(kb.num_edges(), 4);
    assert!(kb.get_vertex_by_name("a").is_some());
    assert!(kb.get_vertex_by_name("b").is_some());
    assert!(kb.get_vertex_by_name("c").is_some());
    assert!(kb.get_vertex_by_name("d").is_none());

    let g = kb.graph();
    let a = kb.get_vertex_by_name("a").unwrap();
    let b = kb.get_vertex_by_name("b").unwrap();
    let c = kb.get_vertex_by_name("c").unwrap();
    for (edge, _) in g.out_edges(a).chain(g.in_edges(a)) {
        assert_eq!(g.edge_prop(edge).weight, 2.0);
    }
    for (edge, src) in g.in_edges(c) {
        assert_eq!(src, b);
        assert_eq!(g.edge_prop(edge).weight, 1.0);
    }
}

#[test]
fn test_self_loop_suppression() {
    let kb = load("u:x v:x w:5\n");
    check_invariants(&kb);
    assert_eq!(kb.num_vertices(), 0);
    assert_eq!(kb.num_edges(), 0);
}

#[test]
fn test_duplicate_edge_merges_reltypes() {
    let kb = load("u:a v:b t:hyper d:1\nu:a v:b t:mero d:1\n");
    check_invariants(&kb);
    assert_eq!(kb.num_vertices(), 2);
    assert_eq!(kb.num_edges(), 1);
    assert_eq!(kb.relation_types(), &["hyper".to_string(), "mero".to_string()]);

    let a = kb.get_vertex_by_name("a").unwrap();
    let (edge, _) = kb.graph().out_edges(a).next().unwrap();
    assert_eq!(kb.graph().edge_prop(edge).rtype, 0b11);
    assert_eq!(kb.get_edge_reltypes(edge), vec!["hyper", "mero"]);
}

#[test]
fn test_source_filter() {
    let settings = KbSettings {
        filter_src: true,
        ..KbSettings::default()
    };
    let kb = load_with(
        "u:a v:b s:wn30 d:1\nu:c v:d s:other d:1\n",
        settings,
        &["wn30"],
    );
    check_invariants(&kb);
    assert_eq!(kb.num_vertices(), 2);
    assert_eq!(kb.num_edges(), 1);
    assert!(kb.get_vertex_by_name("c").is_none());
    assert_eq!(
        kb.relation_sources().iter().collect::<Vec<_>>(),
        vec!["wn30"]
    );
}

#[test]
fn test_unfiltered_sources_are_recorded() {
    let kb = load("u:a v:b s:wn30\nu:b v:c s:kb17\n");
    let sources: Vec<_> = kb.relation_sources().iter().cloned().collect();
    assert_eq!(sources, vec!["kb17".to_string(), "wn30".to_string()]);
}

#[test]
fn test_zero_weight_coerced() {
    let kb = load("u:a v:b w:0\n");
    let g = kb.graph();
    for prop in g.edge_props() {
        assert_eq!(prop.weight, 1.0);
    }
}

#[test]
fn test_comments_and_blank_lines() {
    let kb = load("# header comment\n\n   \nu:a v:b\n# trailing\n");
    assert_eq!(kb.num_vertices(), 2);
    assert_eq!(kb.num_edges(), 2);
}

#[test]
fn test_keep_directed_off_expands_everything() {
    let settings = KbSettings {
        keep_directed: false,
        ..KbSettings::default()
    };
    let kb = load_with("u:a v:b d:1\n", settings, &[]);
    assert_eq!(kb.num_edges(), 2);
}

#[test]
fn test_keep_reltypes_off() {
    let settings = KbSettings {
        keep_reltypes: false,
        ..KbSettings::default()
    };
    let kb = load_with("u:a v:b t:hyper d:1\n", settings, &[]);
    assert!(kb.relation_types().is_empty());
    let a = kb.get_vertex_by_name("a").unwrap();
    let (edge, _) = kb.graph().out_edges(a).next().unwrap();
    assert!(kb.get_edge_reltypes(edge).is_empty());
}

#[test]
fn test_malformed_line_is_annotated() {
    let err = Kb::from_text_reader(
        Cursor::new("u:a v:b\nu:a v\n"),
        KbSettings::default(),
        &BTreeSet::new(),
    )
    .unwrap_err();
    assert!(matches!(err, KbError::MalformedLine { line: 2, .. }));
}

#[test]
fn test_unknown_field_aborts() {
    let err = Kb::from_text_reader(
        Cursor::new("u:a v:b q:1\n"),
        KbSettings::default(),
        &BTreeSet::new(),
    )
    .unwrap_err();
    assert!(matches!(err, KbError::UnknownField { line: 1, .. }));
}

#[test]
fn test_missing_endpoint_aborts() {
    let err = Kb::from_text_reader(
        Cursor::new("v:b t:hyper\n"),
        KbSettings::default(),
        &BTreeSet::new(),
    )
    .unwrap_err();
    assert!(matches!(err, KbError::MissingEndpoint { line: 1 }));
}

#[test]
fn test_33rd_relation_type_fails() {
    let mut text = String::new();
    for i in 0..33 {
        text.push_str(&format!("u:a v:b{i} t:r{i} d:1\n"));
    }
    let err = Kb::from_text_reader(Cursor::new(text), KbSettings::default(), &BTreeSet::new())
        .unwrap_err();
    assert!(matches!(err, KbError::TooManyRelationTypes));
}

#[test]
fn test_edge_add_reltype() {
    let mut kb = load("u:a v:b t:hyper d:1\n");
    let a = kb.get_vertex_by_name("a").unwrap();
    let (edge, _) = kb.graph().out_edges(a).next().unwrap();
    kb.edge_add_reltype(edge, "mero").unwrap();
    assert_eq!(kb.get_edge_reltypes(edge), vec!["hyper", "mero"]);
    // Registering an existing name is idempotent.
    kb.edge_add_reltype(edge, "hyper").unwrap();
    assert_eq!(kb.relation_types().len(), 2);
}

#[test]
fn test_degree_extremes() {
    // a → b, a → c, b → a: outdegrees 2, 1, 0; indegrees 1, 1, 1.
    let kb = load("u:a v:b d:1\nu:a v:c d:1\nu:b v:a d:1\n");
    assert_eq!(kb.outdeg_maxmin(), Some((0, 2)));
    assert_eq!(kb.indeg_maxmin(), Some((1, 1)));

    let empty = load("");
    assert_eq!(empty.outdeg_maxmin(), None);
    assert_eq!(empty.indeg_maxmin(), None);
}
