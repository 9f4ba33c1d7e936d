/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::collections::BTreeSet;
use std::io::Cursor;

use kbgraph::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn load(text: &str) -> Kb {
    load_with(text, KbSettings::default())
}

fn load_with(text: &str, settings: KbSettings) -> Kb {
    Kb::from_text_reader(Cursor::new(text), settings, &BTreeSet::new()).unwrap()
}

fn tight(mut settings: KbSettings) -> KbSettings {
    settings.prank.threshold = 1E-9;
    settings.prank.num_iterations = 1000;
    settings
}

#[test]
fn test_uniform_on_symmetric_pair() {
    let _ = env_logger::builder().is_test(true).try_init();
    let kb = load("u:a v:b\n");
    let ranks = kb.static_prank();
    assert_eq!(ranks.len(), 2);
    assert!((ranks[0] - 0.5).abs() < 1E-4);
    assert!((ranks[1] - 0.5).abs() < 1E-4);
}

#[test]
fn test_static_prank_is_memoized() {
    let kb = load("u:a v:b\nu:b v:c\n");
    let first = kb.static_prank().as_ptr();
    let second = kb.static_prank().as_ptr();
    assert_eq!(first, second);
}

#[test]
fn test_empty_graph() {
    let kb = load("");
    assert!(kb.static_prank().is_empty());
    let mut ranks = vec![1.0; 3];
    kb.pagerank_ppv(&[], &mut ranks);
    assert!(ranks.is_empty());
}

#[test]
fn test_mass_is_conserved_with_dangling_vertices() {
    // b and c are dangling.
    let kb = load_with("u:a v:b d:1\nu:a v:c d:1\n", tight(KbSettings::default()));
    let n = kb.num_vertices();
    let ppv = vec![1.0 / n as f64; n];
    let mut ranks = Vec::new();
    kb.pagerank_ppv(&ppv, &mut ranks);
    let total: f64 = ranks.iter().sum();
    assert!((total - 1.0).abs() < 1E-6, "total mass drifted to {total}");
}

#[test]
fn test_personalization_biases_ranks() {
    let kb = load_with("u:a v:b\n", tight(KbSettings::default()));
    let a = kb.get_vertex_by_name("a").unwrap();
    let b = kb.get_vertex_by_name("b").unwrap();

    let mut ppv = vec![0.0; 2];
    ppv[a] = 1.0;
    let mut ranks = Vec::new();
    kb.pagerank_ppv(&ppv, &mut ranks);
    assert!(ranks[a] > ranks[b]);
    assert!((ranks.iter().sum::<f64>() - 1.0).abs() < 1E-6);
}

#[test]
fn test_weighted_propagation_follows_weights() {
    // a splits its mass between b (weight 1) and c (weight 3); b and c
    // return everything to a.
    let text = "u:a v:b w:1 d:1\nu:a v:c w:3 d:1\nu:b v:a d:1\nu:c v:a d:1\n";

    let weighted = {
        let mut settings = tight(KbSettings::default());
        settings.prank.use_weight = true;
        load_with(text, settings)
    };
    let b = weighted.get_vertex_by_name("b").unwrap();
    let c = weighted.get_vertex_by_name("c").unwrap();
    let ranks = weighted.static_prank();
    assert!(
        ranks[c] > ranks[b] * 2.0,
        "weighted ranks should favor the heavy arc: b={} c={}",
        ranks[b],
        ranks[c]
    );

    let unweighted = load_with(text, tight(KbSettings::default()));
    let ranks = unweighted.static_prank();
    assert!((ranks[b] - ranks[c]).abs() < 1E-6);
}

#[test]
fn test_iteration_cap_is_respected() {
    // With a single allowed iteration and an unreachable threshold the
    // result is one step past the personalization vector, but still a
    // distribution.
    let mut settings = KbSettings::default();
    settings.prank.num_iterations = 1;
    settings.prank.threshold = 1E-30;
    let kb = load_with("u:a v:b\nu:b v:c\n", settings);
    let ranks = kb.static_prank();
    assert!((ranks.iter().sum::<f64>() - 1.0).abs() < 1E-9);
}

#[test]
fn test_ppv_weights_overwrites_edge_weights() {
    let mut kb = load("u:a v:b\nu:b v:c\n");
    let n = kb.num_vertices();
    let ppv: Vec<f64> = (0..n).map(|v| (v + 1) as f64 / 10.0).collect();
    kb.ppv_weights(&ppv);
    let g = kb.graph();
    for u in 0..n {
        for (edge, v) in g.out_edges(u) {
            assert_eq!(g.edge_prop(edge).weight, ppv[v] as f32);
        }
    }
}

#[test]
fn test_ranks_with_names() {
    let kb = load("u:a v:b\n");
    let ranks = kb.static_prank().to_vec();
    let named = kb.ranks_with_names(&ranks);
    assert_eq!(named.len(), 2);
    assert_eq!(named[0].1, kb.graph().name(0));
    assert_eq!(named[0].0, ranks[0]);
}

#[test]
fn test_random_vertex() {
    let kb = load("u:a v:b\nu:b v:c\n");
    let mut rng = SmallRng::seed_from_u64(0);
    for _ in 0..100 {
        let v = kb.get_random_vertex(&mut rng).unwrap();
        assert!(v < kb.num_vertices());
    }
    let empty = load("");
    assert!(empty.get_random_vertex(&mut rng).is_none());
}
