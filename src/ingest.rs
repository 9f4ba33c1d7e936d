/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Line-oriented text ingest.
//!
//! Each non-blank, non-`#` line describes one relation as
//! whitespace-separated `key:value` tokens:
//!
//! ```text
//! u:synset v:synset t:rel i:rel s:source d:directed w:weight
//! ```
//!
//! - `u`: source vertex. Mandatory.
//! - `v`: target vertex. Mandatory.
//! - `t`: relation type (hypernym, meronym, etc.) of the arc `u → v`.
//! - `i`: inverse relation type of the arc `v → u` (hyponym, etc.);
//!   accepted but currently not applied.
//! - `s`: source of the relation (wn30, kb17, etc.).
//! - `d`: `1` if the relation is directed; undirected by default.
//! - `w`: relation weight. Finite and nonnegative; 0 or absent means 1.

use std::collections::BTreeSet;
use std::io::BufRead;

use dsi_progress_logger::ProgressLog;

use crate::error::KbError;
use crate::graphs::prebuild::PreCsr;
use crate::settings::KbSettings;

/// One parsed relation line.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct RelLine {
    pub(crate) u: String,
    pub(crate) v: String,
    pub(crate) rtype: Option<String>,
    pub(crate) irtype: Option<String>,
    pub(crate) src: Option<String>,
    /// 0.0 when the `w:` field is absent; coerced to 1.0 at insertion.
    pub(crate) weight: f32,
    pub(crate) directed: bool,
}

/// Looks up a relation-type name, registering it on first sight.
///
/// Indices are packed into 32-bit masks, so at most 32 distinct names can
/// exist.
pub(crate) fn reltype_index(rtypes: &mut Vec<String>, name: &str) -> Result<u32, KbError> {
    if let Some(idx) = rtypes.iter().position(|r| r == name) {
        return Ok(idx as u32);
    }
    if rtypes.len() >= 32 {
        return Err(KbError::TooManyRelationTypes);
    }
    rtypes.push(name.to_owned());
    Ok((rtypes.len() - 1) as u32)
}

/// Parses one relation line. Returns `None` for a line with no tokens.
pub(crate) fn parse_line(line: &str, line_no: usize) -> Result<Option<RelLine>, KbError> {
    let mut res = RelLine::default();
    let mut seen = false;

    for token in line.split_whitespace() {
        seen = true;
        if token.len() < 3 || token.as_bytes()[1] != b':' {
            return Err(KbError::MalformedLine {
                line: line_no,
                field: token.to_owned(),
            });
        }
        let value = &token[2..];
        match token.as_bytes()[0] {
            b'u' => res.u = value.to_owned(),
            b'v' => res.v = value.to_owned(),
            b't' => res.rtype = Some(value.to_owned()),
            b'i' => res.irtype = Some(value.to_owned()),
            b's' => res.src = Some(value.to_owned()),
            b'w' => {
                res.weight = value.parse().map_err(|_| KbError::MalformedLine {
                    line: line_no,
                    field: token.to_owned(),
                })?;
                if !res.weight.is_finite() || res.weight < 0.0 {
                    return Err(KbError::MalformedLine {
                        line: line_no,
                        field: token.to_owned(),
                    });
                }
            }
            b'd' => {
                res.directed = match value {
                    "1" => true,
                    "0" => false,
                    _ => {
                        return Err(KbError::MalformedLine {
                            line: line_no,
                            field: token.to_owned(),
                        })
                    }
                }
            }
            key => {
                return Err(KbError::UnknownField {
                    line: line_no,
                    key: (key as char).to_string(),
                })
            }
        }
    }

    if !seen {
        return Ok(None);
    }
    if res.u.is_empty() || res.v.is_empty() {
        return Err(KbError::MissingEndpoint { line: line_no });
    }
    Ok(Some(res))
}

/// The outcome of reading a relation stream: the preconstruction buffer
/// plus the registries accumulated along the way.
pub(crate) struct TextRelations {
    pub(crate) pre: PreCsr,
    pub(crate) rtypes: Vec<String>,
    pub(crate) sources: BTreeSet<String>,
}

/// Reads a relation stream into a preconstruction buffer.
///
/// Lines are processed as in the [module documentation](self): source
/// filtering first, then self-loop suppression, provenance registration,
/// relation-type registration (when retention is on), and finally edge
/// insertion with undirected expansion.
pub(crate) fn read_relations<R: BufRead>(
    reader: R,
    settings: &KbSettings,
    src_allowed: &BTreeSet<String>,
    pl: &mut impl ProgressLog,
) -> Result<TextRelations, KbError> {
    let mut pre = PreCsr::new();
    let mut rtypes = Vec::new();
    let mut sources = BTreeSet::new();

    pl.item_name("relation");
    pl.expected_updates(None);
    pl.start("Reading relations...");

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(rel) = parse_line(line, line_no)? else {
            continue;
        };

        if settings.filter_src {
            match &rel.src {
                Some(src) if src_allowed.contains(src) => {}
                _ => continue, // skip this relation
            }
        }

        if rel.u == rel.v {
            continue; // no self-loops
        }

        if let Some(src) = &rel.src {
            sources.insert(src.clone());
        }

        let weight = if rel.weight != 0.0 { rel.weight } else { 1.0 };

        let mut rtype_idx = 0;
        if settings.keep_reltypes {
            if let Some(rtype) = &rel.rtype {
                rtype_idx = reltype_index(&mut rtypes, rtype)?;
            }
        }
        if let Some(irtype) = &rel.irtype {
            log::debug!("line {line_no}: ignoring inverse relation type {irtype:?}");
        }

        pre.insert_edge(&rel.u, &rel.v, weight, rtype_idx);

        // Insert v → u if the relation is undirected
        if !(rel.directed && settings.keep_directed) {
            pre.insert_edge(&rel.v, &rel.u, weight, rtype_idx);
        }
        pl.light_update();
    }

    pl.done();
    log::info!(
        "Read {} vertices and {} arcs ({} relation types, {} sources)",
        pre.num_vertices(),
        pre.num_edges(),
        rtypes.len(),
        sources.len()
    );

    Ok(TextRelations {
        pre,
        rtypes,
        sources,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_full_line() {
        let rel = parse_line("u:a v:b t:hyper i:hypo s:wn30 d:1 w:2.5", 1)
            .unwrap()
            .unwrap();
        assert_eq!(rel.u, "a");
        assert_eq!(rel.v, "b");
        assert_eq!(rel.rtype.as_deref(), Some("hyper"));
        assert_eq!(rel.irtype.as_deref(), Some("hypo"));
        assert_eq!(rel.src.as_deref(), Some("wn30"));
        assert!(rel.directed);
        assert_eq!(rel.weight, 2.5);
    }

    #[test]
    fn test_empty_line_is_none() {
        assert_eq!(parse_line("   ", 3).unwrap(), None);
    }

    #[test]
    fn test_malformed_field() {
        assert!(matches!(
            parse_line("u:a v:", 7),
            Err(KbError::MalformedLine { line: 7, .. })
        ));
        assert!(matches!(
            parse_line("u:a vxb", 8),
            Err(KbError::MalformedLine { line: 8, .. })
        ));
        assert!(matches!(
            parse_line("u:a v:b w:nope", 9),
            Err(KbError::MalformedLine { line: 9, .. })
        ));
    }

    #[test]
    fn test_unknown_field() {
        assert!(matches!(
            parse_line("u:a v:b x:1", 2),
            Err(KbError::UnknownField { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_endpoint() {
        assert!(matches!(
            parse_line("u:a", 5),
            Err(KbError::MissingEndpoint { line: 5 })
        ));
    }

    #[test]
    fn test_reltype_cap() {
        let mut rtypes = Vec::new();
        for i in 0..32u32 {
            assert_eq!(reltype_index(&mut rtypes, &format!("r{i}")).unwrap(), i);
        }
        // Known names still resolve
        assert_eq!(reltype_index(&mut rtypes, "r5").unwrap(), 5);
        assert!(matches!(
            reltype_index(&mut rtypes, "r32"),
            Err(KbError::TooManyRelationTypes)
        ));
    }
}
