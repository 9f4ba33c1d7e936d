/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Breadth-first visits keeping track of predecessors.
//!
//! Since every [`EventPred`] after initialization carries the predecessor
//! of the visited node, all post-initialization events can be read as arc
//! events: [`Discover`](EventPred::Discover) is a tree arc (except at a
//! root, where `node == pred`), and [`Revisit`](EventPred::Revisit) is a
//! back, forward, or cross arc.

use crate::traits::RandomAccessGraph;
use crate::visits::Sequential;
use nonmax::NonMaxUsize;
use std::{collections::VecDeque, ops::ControlFlow, ops::ControlFlow::Continue};
use sux::prelude::BitVec;

/// Events generated by a breadth-first visit.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum EventPred {
    /// Set-up event, emitted once before the first root is visited.
    Init,
    /// The node has been encountered for the first time: we are traversing
    /// a new tree arc, unless `node == pred` (the node is a root).
    Discover {
        /// The current node.
        node: usize,
        /// The predecessor of `node`.
        pred: usize,
        /// The distance of `node` from the roots.
        distance: usize,
    },
    /// The node has been encountered before: we are traversing a back,
    /// forward, or cross arc.
    Revisit {
        /// The current node.
        node: usize,
        /// The predecessor of `node`.
        pred: usize,
    },
    /// The visit has been completed.
    ///
    /// This event does not happen if the visit is interrupted by a
    /// callback returning a break value.
    Done,
}

/// A sequential breadth-first visit.
///
/// Nodes are reported when they are *discovered*, not when they are
/// dequeued; distances are tracked by inserting a level separator between
/// nodes at different distances. To keep the queue compact, nodes are
/// stored as [`NonMaxUsize`], so the `None` variant of
/// `Option<NonMaxUsize>` can double as the separator.
///
/// # Examples
///
/// Computing a predecessor map from node 0:
///
/// ```
/// use kbgraph::graphs::csr::{CsrGraph, EdgeProp};
/// use kbgraph::visits::{breadth_first, Sequential};
/// use no_break::NoBreak;
/// use std::ops::ControlFlow::Continue;
///
/// let arcs = [(0, 1), (1, 2), (1, 3)];
/// let props = vec![EdgeProp::default(); arcs.len()];
/// let names = (0..4).map(|i| i.to_string()).collect();
/// let graph = CsrGraph::from_edges(4, &arcs, props, names);
///
/// let mut parents = vec![0, 1, 2, 3];
/// let mut visit = breadth_first::Seq::new(&graph);
/// visit
///     .visit([0], |event| {
///         if let breadth_first::EventPred::Discover { node, pred, .. } = event {
///             parents[node] = pred;
///         }
///         Continue(())
///     })
///     .continue_value_no_break();
///
/// assert_eq!(parents, vec![0, 0, 1, 1]);
/// ```
pub struct Seq<G: RandomAccessGraph> {
    graph: G,
    visited: BitVec,
    /// The visit queue; `None` separates nodes at different distances.
    queue: VecDeque<Option<NonMaxUsize>>,
}

impl<G: RandomAccessGraph> Seq<G> {
    /// Creates a new sequential breadth-first visit.
    pub fn new(graph: G) -> Self {
        let num_nodes = graph.num_nodes();
        Self {
            graph,
            visited: BitVec::new(num_nodes),
            queue: VecDeque::new(),
        }
    }
}

impl<G: RandomAccessGraph> Sequential<EventPred> for Seq<G> {
    fn visit_with<
        R: IntoIterator<Item = usize>,
        T,
        E,
        C: FnMut(&mut T, EventPred) -> ControlFlow<E, ()>,
    >(
        &mut self,
        roots: R,
        mut init: T,
        mut callback: C,
    ) -> ControlFlow<E, ()> {
        self.queue.clear();

        for root in roots {
            if self.visited[root] {
                continue;
            }

            // Init is only emitted if there is at least one fresh root.
            if self.queue.is_empty() {
                callback(&mut init, EventPred::Init)?;
            }

            self.visited.set(root, true);
            self.queue.push_back(Some(
                NonMaxUsize::new(root).expect("node index should never be usize::MAX"),
            ));

            callback(
                &mut init,
                EventPred::Discover {
                    node: root,
                    pred: root,
                    distance: 0,
                },
            )?;
        }

        if self.queue.is_empty() {
            return Continue(());
        }

        // Level separator
        self.queue.push_back(None);
        let mut distance = 1;

        while let Some(current_node) = self.queue.pop_front() {
            match current_node {
                Some(node) => {
                    let node = node.into();
                    for succ in self.graph.successors(node) {
                        let (node, pred) = (succ, node);
                        if !self.visited[succ] {
                            self.visited.set(succ, true);
                            callback(
                                &mut init,
                                EventPred::Discover {
                                    node,
                                    pred,
                                    distance,
                                },
                            )?;
                            self.queue.push_back(Some(
                                NonMaxUsize::new(succ)
                                    .expect("node index should never be usize::MAX"),
                            ));
                        } else {
                            callback(&mut init, EventPred::Revisit { node, pred })?;
                        }
                    }
                }
                None => {
                    // End of the current level.
                    if !self.queue.is_empty() {
                        distance += 1;
                        self.queue.push_back(None);
                    }
                }
            }
        }

        callback(&mut init, EventPred::Done)
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.visited = BitVec::new(self.graph.num_nodes());
    }
}
