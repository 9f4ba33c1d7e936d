/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

pub mod distances;
pub mod engine;
pub mod error;
pub mod graphs;
pub mod ingest;
pub mod rank;
pub mod settings;
pub mod snapshot;
pub mod traits;
pub mod visits;

pub use error::KbError;

pub mod prelude {
    pub use crate::engine::Kb;
    pub use crate::error::KbError;
    pub use crate::graphs::csr::{CsrGraph, EdgeProp};
    pub use crate::settings::{KbSettings, PrankSettings};
    pub use crate::traits::RandomAccessGraph;
    pub use crate::visits::breadth_first;
}
