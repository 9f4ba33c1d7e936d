/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Visits on graphs.
//!
//! A visit walks the graph from a set of roots and reports what it sees
//! through a callback receiving events of type `A` and returning a
//! `ControlFlow<E, ()>`: returning [`Break`](std::ops::ControlFlow::Break)
//! interrupts the visit, and the break value becomes the return value of
//! the visit method. An interruption does not necessarily denote an error
//! condition: a caller that has gathered enough (for example, a bounded
//! subgraph extraction that has admitted its vertex cap) breaks with
//! [`StoppedWhenDone`]. For uninterruptible visits we suggest the
//! [`no-break`](https://crates.io/crates/no-break) crate and its
//! `continue_value_no_break` method on the result, so type inference runs
//! smoothly.
//!
//! Visits provide a `reset` method so the same visit (and its internal
//! state) can be reused across queries.

pub mod breadth_first;

use std::ops::ControlFlow;
use thiserror::Error;

#[derive(Error, Debug)]
/// The visit was interrupted.
#[error("The visit was interrupted")]
pub struct Interrupted;

#[derive(Error, Debug)]
/// The result of the visit was computed without completing the visit; for
/// example, a bounded subgraph extraction stops as soon as it has admitted
/// its vertex cap.
#[error("Stopped when done")]
pub struct StoppedWhenDone;

/// A sequential visit generating events of type `A`.
///
/// Different visit types may interpret the roots differently: a
/// [breadth-first visit](breadth_first) treats them as the initial queue.
pub trait Sequential<A> {
    /// Visits the graph from the specified roots with an initialization
    /// value that is passed to every callback invocation.
    ///
    /// See the [module documentation](crate::visits) for the meaning of
    /// the return value.
    fn visit_with<
        R: IntoIterator<Item = usize>,
        T,
        E,
        C: FnMut(&mut T, A) -> ControlFlow<E, ()>,
    >(
        &mut self,
        roots: R,
        init: T,
        callback: C,
    ) -> ControlFlow<E, ()>;

    /// Visits the graph from the specified roots.
    #[inline(always)]
    fn visit<R: IntoIterator<Item = usize>, E, C: FnMut(A) -> ControlFlow<E, ()>>(
        &mut self,
        roots: R,
        mut callback: C,
    ) -> ControlFlow<E, ()> {
        self.visit_with(roots, (), |(), event| callback(event))
    }

    /// Resets the visit status so it can be reused.
    fn reset(&mut self);
}
