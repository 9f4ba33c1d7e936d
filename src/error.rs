/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Error types for the knowledge-base engine.

use thiserror::Error;

/// Errors surfaced by knowledge-base loading, serialization, and queries.
///
/// Load failures abort the current operation and leave the engine in its
/// prior state; the engine never retries I/O on its own.
#[derive(Error, Debug)]
pub enum KbError {
    /// [`instance`](crate::engine::instance) was called before any
    /// `create_from_*` entry point populated the default slot.
    #[error("KB not initialized")]
    NotInitialized,

    /// An underlying read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The text parser could not tokenize a field.
    #[error("malformed field {field:?} in line {line}")]
    MalformedLine { line: usize, field: String },

    /// A relation line is missing its mandatory `u:` or `v:` field.
    #[error("missing source or target vertex in line {line}")]
    MissingEndpoint { line: usize },

    /// A relation line carries a field with an unrecognized key.
    #[error("unknown field {key:?} in line {line}")]
    UnknownField { line: usize, key: String },

    /// A 33rd distinct relation-type name was about to be registered;
    /// relation types are packed into a 32-bit mask.
    #[error("too many relation types (the limit is 32)")]
    TooManyRelationTypes,

    /// A snapshot section marker did not match. Snapshots are not a
    /// portable format; this usually means the file is not a knowledge-base
    /// snapshot at all.
    #[error("invalid magic number {found:#x} in snapshot ({context})")]
    BadMagic { found: u64, context: &'static str },

    /// The stream carries a pre-2.0 serialization; it must be converted
    /// offline before it can be loaded.
    #[error("legacy (pre 2.0) knowledge-base format; convert it with the \"convert2.0\" utility")]
    LegacyMagic,

    /// The snapshot ended in the middle of a section.
    #[error("truncated snapshot (short read while decoding {context})")]
    TruncatedSnapshot { context: &'static str },
}
