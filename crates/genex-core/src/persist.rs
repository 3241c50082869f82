//! Binary and legacy-text (de)serialization of a [`GlobalIndex`] (component
//! H), grounded in `original_source/genex/group/GlobalGroupSpace.cpp`'s
//! `saveGroups`/`loadGroups` pair and `spec.md` §6.
//!
//! The binary format writes centroids lazily recomputed on load from
//! members: only `(id, count, members)` per cluster is persisted, exactly
//! as the source's own serializer does.

use crate::config::EngineConfig;
use crate::distance::DistanceRegistry;
use crate::error::{GenexError, Result};
use crate::group::{add_member, seed_cluster};
use crate::index::GlobalIndex;
use crate::length_space::LengthSpace;
use crate::sequence::SampleBlock;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};

const FORMAT_VERSION: u64 = 1;

fn write_u64(out: &mut impl Write, v: u64) -> io::Result<()> {
    out.write_all(&v.to_le_bytes())
}

fn write_f64(out: &mut impl Write, v: f64) -> io::Result<()> {
    out.write_all(&v.to_le_bytes())
}

fn write_str(out: &mut impl Write, s: &str) -> io::Result<()> {
    write_u64(out, s.len() as u64)?;
    out.write_all(s.as_bytes())
}

fn read_u64(input: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64(input: &mut impl Read) -> Result<f64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_string(input: &mut impl Read) -> Result<String> {
    let len = read_u64(input)? as usize;
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| GenexError::ParseError(e.to_string()))
}

/// Serializes `index` into the deflate-compressed binary format described
/// in `spec.md` §6: item count, max item length, space count, distance
/// name, threshold, then per length space its clusters' `(id, count,
/// members)` triples. Centroids are never written; they are recomputed
/// from members on load.
pub fn save(index: &GlobalIndex, item_count: usize, out: &mut impl Write) -> Result<()> {
    let mut encoder = DeflateEncoder::new(out, Compression::default());

    write_u64(&mut encoder, FORMAT_VERSION)?;
    write_u64(&mut encoder, item_count as u64)?;
    write_u64(&mut encoder, index.max_len() as u64)?;
    write_u64(&mut encoder, index.spaces().len() as u64)?;
    write_str(&mut encoder, index.distance_name())?;
    write_f64(&mut encoder, index.threshold())?;
    write_f64(&mut encoder, index.warping_band_ratio())?;

    for (&length, space) in index.spaces() {
        write_u64(&mut encoder, length as u64)?;
        write_u64(&mut encoder, space.num_clusters() as u64)?;
        for cluster in space.clusters() {
            write_u64(&mut encoder, cluster.id() as u64)?;
            write_u64(&mut encoder, cluster.count() as u64)?;
            let members: Vec<(usize, usize)> = space.members_of(cluster).collect();
            write_u64(&mut encoder, members.len() as u64)?;
            // `members_of` yields reverse insertion order; persist in the
            // order members were originally added, matching the source.
            for (row, start) in members.into_iter().rev() {
                write_u64(&mut encoder, row as u64)?;
                write_u64(&mut encoder, start as u64)?;
            }
        }
    }

    encoder.finish()?;
    Ok(())
}

/// Restores a [`GlobalIndex`] previously written by [`save`], validating it
/// against `block`. Fails with [`GenexError::IncompatibleIndex`] if the
/// persisted item count or item length disagree with `block`.
pub fn load(block: &SampleBlock, input: impl Read) -> Result<GlobalIndex> {
    let mut decoder = DeflateDecoder::new(input);

    let version = read_u64(&mut decoder)?;
    if version != FORMAT_VERSION {
        return Err(GenexError::IncompatibleIndex(format!(
            "persisted format version {version} does not match supported version {FORMAT_VERSION}"
        )));
    }
    let item_count = read_u64(&mut decoder)? as usize;
    let max_len = read_u64(&mut decoder)? as usize;
    if item_count != block.item_count() {
        return Err(GenexError::IncompatibleIndex(format!(
            "persisted item count {item_count} does not match dataset item count {}",
            block.item_count()
        )));
    }
    if max_len != block.item_length() {
        return Err(GenexError::IncompatibleIndex(format!(
            "persisted max item length {max_len} does not match dataset item length {}",
            block.item_length()
        )));
    }

    let num_spaces = read_u64(&mut decoder)? as usize;
    let distance_name = read_string(&mut decoder)?;
    let threshold = read_f64(&mut decoder)?;
    let warping_band_ratio = read_f64(&mut decoder)?;
    DistanceRegistry::lookup(&distance_name)?;

    let mut spaces = BTreeMap::new();
    for _ in 0..num_spaces {
        let length = read_u64(&mut decoder)? as usize;
        let num_clusters = read_u64(&mut decoder)? as usize;
        let space = rebuild_length_space(block, length, num_clusters, &mut decoder)?;
        spaces.insert(length, space);
    }

    Ok(GlobalIndex::from_parts(spaces, max_len, distance_name, threshold, warping_band_ratio))
}

fn rebuild_length_space(block: &SampleBlock, length: usize, num_clusters: usize, decoder: &mut impl Read) -> Result<LengthSpace> {
    let mut space = LengthSpace::empty(block, length)?;
    for _ in 0..num_clusters {
        let id = read_u64(decoder)? as u32;
        let count = read_u64(decoder)? as usize;
        let num_members = read_u64(decoder)? as usize;
        let mut first: Option<(usize, usize)> = None;
        let mut rest: Vec<(usize, usize)> = Vec::with_capacity(num_members.saturating_sub(1));
        for i in 0..num_members {
            let row = read_u64(decoder)? as usize;
            let start = read_u64(decoder)? as usize;
            if i == 0 {
                first = Some((row, start));
            } else {
                rest.push((row, start));
            }
        }
        let (seed_row, seed_start) = first.ok_or_else(|| GenexError::IncompatibleIndex(format!("cluster {id} has no members")))?;
        space.restore_cluster(block, id, seed_row, seed_start, rest)?;
        debug_assert_eq!(space.clusters().last().map(|c| c.count()), Some(count));
    }
    Ok(space)
}

/// Incrementally read-only parser for the legacy text format. Tolerates the
/// `[2, space.size())` vs full-`space.size()` length-range inconsistency the
/// original serializer exhibits (`spec.md` §9): some dumps start their
/// per-length block at length 2 even when the persisted space count implies
/// a different range. We trust the explicit length tag printed before each
/// block rather than inferring it positionally.
pub mod legacy {
    use super::*;
    use std::io::BufRead;

    /// Restores a [`GlobalIndex`] from the legacy text format: a version
    /// tag, threshold, item count, item length, then per length space a
    /// group count followed by either `(count)`-only lines or full member
    /// dumps.
    pub fn load(block: &SampleBlock, reader: impl BufRead) -> Result<GlobalIndex> {
        let mut lines = reader.lines();
        let mut next_token = || -> Result<String> {
            loop {
                let line = lines
                    .next()
                    .ok_or_else(|| GenexError::ParseError("unexpected end of legacy index file".to_string()))??;
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return Ok(trimmed.to_string());
                }
            }
        };
        let mut next_tokens = |n: usize| -> Result<Vec<String>> {
            let line = next_token()?;
            let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if tokens.len() < n {
                return Err(GenexError::ParseError(format!("expected {n} tokens, found {}", tokens.len())));
            }
            Ok(tokens)
        };
        let parse_usize = |s: &str| -> Result<usize> { s.parse().map_err(|_| GenexError::ParseError(format!("invalid integer: {s}"))) };
        let parse_f64 = |s: &str| -> Result<f64> { s.parse().map_err(|_| GenexError::ParseError(format!("invalid float: {s}"))) };

        let header = next_tokens(1)?;
        let version = parse_usize(&header[0])?;
        if version != FORMAT_VERSION as usize {
            return Err(GenexError::IncompatibleIndex(format!("legacy index version {version} is not supported")));
        }
        let threshold_tok = next_tokens(1)?;
        let threshold = parse_f64(&threshold_tok[0])?;
        let counts = next_tokens(2)?;
        let item_count = parse_usize(&counts[0])?;
        let item_length = parse_usize(&counts[1])?;
        if item_count != block.item_count() || item_length != block.item_length() {
            return Err(GenexError::IncompatibleIndex(
                "legacy index item count or item length does not match dataset".to_string(),
            ));
        }

        let mut spaces = BTreeMap::new();
        loop {
            let tag = match next_token() {
                Ok(t) => t,
                Err(_) => break,
            };
            let mut parts = tag.split_whitespace();
            let length: usize = parts
                .next()
                .ok_or_else(|| GenexError::ParseError("missing length tag".to_string()))
                .and_then(|s| parse_usize(s))?;
            let num_clusters: usize = parts
                .next()
                .ok_or_else(|| GenexError::ParseError("missing group count".to_string()))
                .and_then(|s| parse_usize(s))?;

            let mut space = LengthSpace::empty(block, length)?;
            for _ in 0..num_clusters {
                let tokens = next_tokens(1)?;
                let mut fields = tokens[0].split_whitespace();
                let id: u32 = fields
                    .next()
                    .ok_or_else(|| GenexError::ParseError("missing cluster id".to_string()))
                    .and_then(parse_usize)? as u32;
                let count = fields
                    .next()
                    .ok_or_else(|| GenexError::ParseError("missing cluster count".to_string()))
                    .and_then(parse_usize)?;
                let remaining: Vec<&str> = fields.collect();
                if remaining.is_empty() {
                    // size-only dump: no member identities recoverable, so
                    // this cluster cannot be rehydrated structurally.
                    return Err(GenexError::ParseError(
                        "legacy size-only cluster dumps cannot be restored without member identities".to_string(),
                    ));
                }
                let mut members = Vec::with_capacity(remaining.len() / 2);
                for pair in remaining.chunks(2) {
                    if pair.len() != 2 {
                        return Err(GenexError::ParseError("malformed member pair in legacy dump".to_string()));
                    }
                    members.push((parse_usize(pair[0])?, parse_usize(pair[1])?));
                }
                let (seed_row, seed_start) = members[0];
                space.restore_cluster(block, id, seed_row, seed_start, members[1..].to_vec())?;
                debug_assert_eq!(space.clusters().last().map(|c| c.count()), Some(count));
            }
            spaces.insert(length, space);
        }

        Ok(GlobalIndex::from_parts(spaces, item_length, "euclidean".to_string(), threshold, EngineConfig::default().warping_band_ratio))
    }
}
