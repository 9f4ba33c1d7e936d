/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Personalized PageRank over the knowledge-base graph.
//!
//! This is a sequential power iteration with teleportation,
//!
//! > **x**′ = (1 − α) **v** + α (*W*ᵀ **x** + (**d** · **x**) **v**)
//!
//! where **v** is the preference (personalization) vector, **d** is the
//! characteristic vector of dangling vertices, and *W* is the
//! out-normalized adjacency matrix: `W[u, v] = w(u, v) / out_coef(u)` in
//! weighted mode, or `1 / outdegree(u)` otherwise. Dangling vertices thus
//! return their mass through the preference vector, so the total mass
//! stays 1 across iterations.
//!
//! The iteration is double-buffered: all entries of the current
//! approximation are read before any entry of the next one is written.
//!
//! # Stopping
//!
//! [`run`](PageRank::run) polls a stopping rule after every round, handing
//! it the round count and the ℓ₁ norm of the last update. The rule is any
//! [`Predicate`] over [`stop::IterStats`]; the engine uses [`stop::Stop`],
//! which ends the computation at a convergence threshold or an iteration
//! cap, whichever is hit first.

pub mod stop {
    //! Stopping rules for the power iteration.

    use predicates::reflection::PredicateReflection;
    use predicates::Predicate;
    use std::fmt;

    /// Per-round statistics handed to a stopping rule.
    #[derive(Debug)]
    pub struct IterStats {
        /// Rounds completed so far.
        pub iterations: usize,
        /// ℓ₁ norm of the difference between the last two approximations.
        pub norm_delta: f64,
    }

    /// Stops at a convergence threshold or an iteration cap, whichever is
    /// hit first.
    ///
    /// This is the rule the engine builds from
    /// [`PrankSettings`](crate::settings::PrankSettings).
    ///
    /// # Examples
    /// ```
    /// use kbgraph::rank::pagerank::stop::{IterStats, Stop};
    /// use predicates::Predicate;
    ///
    /// let rule = Stop::new(1E-6, 100);
    /// assert!(rule.eval(&IterStats { iterations: 100, norm_delta: 1.0 }));
    /// assert!(rule.eval(&IterStats { iterations: 3, norm_delta: 1E-9 }));
    /// assert!(!rule.eval(&IterStats { iterations: 3, norm_delta: 0.5 }));
    /// ```
    #[derive(Debug, Clone, Copy)]
    pub struct Stop {
        threshold: f64,
        max_iterations: usize,
    }

    impl Stop {
        /// Creates a stopping rule.
        ///
        /// # Panics
        ///
        /// Panics if `threshold` is not a positive number.
        pub fn new(threshold: f64, max_iterations: usize) -> Self {
            assert!(
                threshold > 0.0,
                "The convergence threshold must be positive, got {threshold}"
            );
            Self {
                threshold,
                max_iterations,
            }
        }
    }

    impl fmt::Display for Stop {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "(norm <= {} or iteration >= {})",
                self.threshold, self.max_iterations
            )
        }
    }

    impl PredicateReflection for Stop {}

    impl Predicate<IterStats> for Stop {
        fn eval(&self, stats: &IterStats) -> bool {
            stats.norm_delta <= self.threshold || stats.iterations >= self.max_iterations
        }
    }
}

use crate::graphs::csr::CsrGraph;
use crate::traits::RandomAccessGraph;
use dsi_progress_logger::{no_logging, ProgressLog};
use kahan::KahanSum;
use predicates::Predicate;

/// Computes personalized PageRank by double-buffered power iteration.
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run); after completion the rank vector is available via
/// [`rank`](Self::rank).
///
/// The constructor takes the out-coefficient array along with the graph:
/// `out_coefs[u]` must be the sum of the out-arc weights of `u` (weighted
/// mode) or its outdegree (unweighted mode), with 0 marking dangling
/// vertices. The engine caches this array across queries, which is why it
/// is not computed here.
///
/// # Examples
///
/// ```
/// use kbgraph::graphs::csr::{CsrGraph, EdgeProp};
/// use kbgraph::rank::pagerank::{stop, PageRank};
///
/// // A 2-cycle: the stationary distribution is uniform.
/// let arcs = [(0, 1), (1, 0)];
/// let props = vec![EdgeProp::default(); 2];
/// let names = vec!["a".into(), "b".into()];
/// let graph = CsrGraph::from_edges(2, &arcs, props, names);
///
/// let out_coefs = [1.0, 1.0];
/// let mut pr = PageRank::new(&graph, &out_coefs, false);
/// pr.run(stop::Stop::new(1E-9, 1000));
///
/// assert!((pr.rank()[0] - 0.5).abs() < 1E-6);
/// assert!((pr.rank().iter().sum::<f64>() - 1.0).abs() < 1E-9);
/// ```
pub struct PageRank<'a> {
    graph: &'a CsrGraph,
    out_coefs: &'a [f64],
    use_weight: bool,
    alpha: f64,
    preference: Option<&'a [f64]>,

    rank: Box<[f64]>,
    rank_tmp: Box<[f64]>,
    norm_delta: f64,
    iteration: usize,
}

impl<'a> PageRank<'a> {
    /// Creates a new PageRank computation.
    ///
    /// # Panics
    ///
    /// Panics if `out_coefs` is not sized to the number of vertices.
    pub fn new(graph: &'a CsrGraph, out_coefs: &'a [f64], use_weight: bool) -> Self {
        let n = graph.num_nodes();
        assert_eq!(
            out_coefs.len(),
            n,
            "Out-coefficient array length ({}) does not match the number of nodes ({n})",
            out_coefs.len()
        );
        Self {
            graph,
            out_coefs,
            use_weight,
            alpha: 0.85,
            preference: None,
            rank: vec![0.0; n].into_boxed_slice(),
            rank_tmp: vec![0.0; n].into_boxed_slice(),
            norm_delta: f64::INFINITY,
            iteration: 0,
        }
    }

    /// Sets the damping factor α.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in the open interval (0 . . 1).
    pub fn alpha(&mut self, alpha: f64) -> &mut Self {
        assert!(
            alpha > 0.0 && alpha < 1.0,
            "The damping factor must be in (0 . . 1), got {alpha}"
        );
        self.alpha = alpha;
        self
    }

    /// Sets the preference (personalization) vector, which doubles as the
    /// dangling-vertex distribution.
    ///
    /// The vector must sum to 1; the engine does not normalize it. Pass
    /// `None` to revert to the uniform preference (1/*n*).
    ///
    /// # Panics
    ///
    /// Panics if the length of the vector does not match the number of
    /// nodes. In test mode, we also check for stochasticity (nonnegative
    /// entries summing to 1 within a tolerance of 1E-6) and panic if the
    /// check fails.
    pub fn preference(&mut self, preference: Option<&'a [f64]>) -> &mut Self {
        if let Some(v) = preference {
            let n = self.graph.num_nodes();
            assert_eq!(
                v.len(),
                n,
                "Preference vector length ({}) does not match the number of nodes ({n})",
                v.len()
            );
            #[cfg(test)]
            Self::assert_stochastic(v, "preference");
        }
        self.preference = preference;
        self
    }

    /// Returns the rank vector.
    ///
    /// After calling [`run`](Self::run), this contains the computed
    /// PageRank values.
    pub fn rank(&self) -> &[f64] {
        &self.rank
    }

    /// Returns the number of iterations performed by the last call to
    /// [`run`](Self::run).
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Returns the ℓ₁ norm of the difference between the last two
    /// approximations.
    pub fn norm_delta(&self) -> f64 {
        self.norm_delta
    }

    /// Runs the PageRank computation until the given stopping rule is
    /// satisfied.
    pub fn run(&mut self, predicate: impl Predicate<stop::IterStats>) {
        self.run_with_logging(predicate, no_logging![]);
    }

    /// Runs the PageRank computation until the given stopping rule is
    /// satisfied, logging iteration progress on `pl`.
    pub fn run_with_logging(
        &mut self,
        predicate: impl Predicate<stop::IterStats>,
        pl: &mut impl ProgressLog,
    ) {
        let graph = self.graph;
        let out_coefs = self.out_coefs;
        let use_weight = self.use_weight;
        let alpha = self.alpha;
        let preference = self.preference;

        let n = graph.num_nodes();
        if n == 0 {
            return;
        }

        log::info!("Alpha: {}", alpha);
        log::info!(
            "Preference: {}",
            if preference.is_some() {
                "custom"
            } else {
                "uniform"
            }
        );
        log::info!("Stopping criterion: {}", predicate);

        self.iteration = 0;
        let inv_n = 1.0 / n as f64;

        // Fill rank with preference vector
        match preference {
            Some(v) => self.rank.copy_from_slice(v),
            None => self.rank.fill(inv_n),
        }

        let dangling: Vec<usize> = (0..n).filter(|&v| out_coefs[v] == 0.0).collect();
        log::info!("{} dangling vertices", dangling.len());

        pl.item_name("iteration");
        pl.expected_updates(None);
        pl.start(format!("Computing PageRank (alpha={alpha})..."));

        loop {
            // Mass held by dangling vertices under the current approximation;
            // it is returned through the preference vector.
            let mut dangling_rank = KahanSum::<f64>::new();
            for &v in &dangling {
                dangling_rank += self.rank[v];
            }
            let dangling_rank = dangling_rank.sum();

            let mut norm = KahanSum::<f64>::new();

            for v in 0..n {
                let mut sigma = KahanSum::<f64>::new();
                for (edge, u) in graph.in_edges(v) {
                    let w = if use_weight {
                        graph.edge_prop(edge).weight as f64
                    } else {
                        1.0
                    };
                    sigma += self.rank[u] * w / out_coefs[u];
                }

                let v_i = match preference {
                    Some(p) => p[v],
                    None => inv_n,
                };

                let new_rank = (1.0 - alpha) * v_i + alpha * (sigma.sum() + dangling_rank * v_i);
                norm += (new_rank - self.rank[v]).abs();
                self.rank_tmp[v] = new_rank;
            }

            std::mem::swap(&mut self.rank, &mut self.rank_tmp);
            self.norm_delta = norm.sum();
            self.iteration += 1;

            log::debug!(
                "Iteration {}: norm delta = {}",
                self.iteration,
                self.norm_delta
            );
            pl.update_and_display();

            if predicate.eval(&stop::IterStats {
                iterations: self.iteration,
                norm_delta: self.norm_delta,
            }) {
                break;
            }
        }

        pl.done();
    }

    /// Checks that a vector is stochastic (all entries nonnegative and
    /// summing to 1 within a tolerance of 1E-6).
    #[cfg(test)]
    fn assert_stochastic(v: &[f64], name: &str) {
        for (i, &x) in v.iter().enumerate() {
            assert!(
                x >= 0.0,
                "The {name} vector has a negative entry at index {i}: {x}"
            );
        }
        let sum: f64 = v.iter().sum();
        assert!(
            (sum - 1.0).abs() < 1E-6,
            "The {name} vector is not stochastic (sum = {sum})"
        );
    }
}
