/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Engine configuration.
//!
//! The engine reads its tunables through this narrow settings structure
//! rather than from global state: factories take a [`KbSettings`] value and
//! the engine keeps it for the lifetime of the loaded graph.

/// Options consumed by the knowledge-base engine.
#[derive(Debug, Clone)]
pub struct KbSettings {
    /// Restrict text ingest to relations whose `s:` provenance tag is in
    /// the allowed set passed to the factory.
    pub filter_src: bool,
    /// Respect the `d:` field of relation lines. When false, every
    /// relation is expanded into both arcs regardless of `d:`.
    pub keep_directed: bool,
    /// Record relation-type names (`t:` fields) in the registry.
    pub keep_reltypes: bool,
    /// Reject legacy (pre-2.0) text loading.
    pub v1_kb: bool,
    /// PageRank tunables.
    pub prank: PrankSettings,
}

impl Default for KbSettings {
    fn default() -> Self {
        Self {
            filter_src: false,
            keep_directed: true,
            keep_reltypes: true,
            v1_kb: false,
            prank: PrankSettings::default(),
        }
    }
}

/// PageRank tunables.
#[derive(Debug, Clone)]
pub struct PrankSettings {
    /// Propagate rank proportionally to edge weights; otherwise every
    /// out-arc of a vertex carries the same share.
    pub use_weight: bool,
    /// Iteration cap.
    pub num_iterations: usize,
    /// Convergence cutoff on the ℓ₁ norm of the difference between
    /// successive rank vectors.
    pub threshold: f64,
    /// Damping factor, in (0..1).
    pub damping: f64,
}

impl Default for PrankSettings {
    fn default() -> Self {
        Self {
            use_weight: false,
            num_iterations: 30,
            threshold: 1E-4,
            damping: 0.85,
        }
    }
}
