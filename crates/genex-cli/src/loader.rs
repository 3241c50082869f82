//! Textual dataset loader (the "external loader collaborator" `spec.md` §6
//! describes but explicitly keeps out of `genex-core`).
//!
//! Each row is a whitespace- or comma-separated list of floating literals,
//! with an optional leading name column detected heuristically: if the
//! first token on a row fails to parse as a float, it's dropped as a name.
//! Rows may be ragged; `genex_core::SampleBlock` tracks each row's real
//! length and pads the rest.
//!
//! `ParseError` lives in `genex_core::error`'s shared taxonomy but is only
//! ever constructed here, matching the failure class `spec.md` §7 assigns to
//! the loader collaborator rather than the core. `IoError` is also
//! constructed here for dataset-file opens, but `persist.rs` constructs it
//! too (via `From<std::io::Error>`) for its own truncated/corrupt reads.

use genex_core::error::{GenexError, Result};
use genex_core::Sample;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// One parsed row: its optional name, and its sample values.
pub struct Row {
    pub name: Option<String>,
    pub values: Vec<Sample>,
}

fn split_tokens(line: &str) -> Vec<&str> {
    if line.contains(',') {
        line.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
    } else {
        line.split_whitespace().collect()
    }
}

fn parse_row(line: &str) -> Result<Row> {
    let tokens = split_tokens(line);
    if tokens.is_empty() {
        return Err(GenexError::ParseError("empty data row".to_string()));
    }

    let (name, value_tokens) = match tokens[0].parse::<Sample>() {
        Ok(_) => (None, &tokens[..]),
        Err(_) => (Some(tokens[0].to_string()), &tokens[1..]),
    };

    let mut values = Vec::with_capacity(value_tokens.len());
    for tok in value_tokens {
        let v: Sample = tok
            .parse()
            .map_err(|_| GenexError::ParseError(format!("invalid numeric literal {tok:?}")))?;
        values.push(v);
    }
    Ok(Row { name, values })
}

/// Parses every non-blank line of `reader` as a dataset row.
pub fn parse_rows(reader: impl Read) -> Result<Vec<Row>> {
    let buffered = BufReader::new(reader);
    let mut rows = Vec::new();
    for (line_no, line) in buffered.lines().enumerate() {
        let line = line.map_err(GenexError::from)?;
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_row(&line)
            .map_err(|e| GenexError::ParseError(format!("line {}: {e}", line_no + 1)))?;
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(GenexError::ParseError("dataset file contains no data rows".to_string()));
    }
    Ok(rows)
}

/// Reads and parses a dataset file into a [`genex_core::SampleBlock`],
/// discarding any name column.
pub fn load_dataset_file(path: &Path) -> Result<genex_core::SampleBlock> {
    let file = std::fs::File::open(path)
        .map_err(|e| GenexError::IoError(format!("opening dataset file {}: {e}", path.display())))?;
    let rows = parse_rows(file)?;
    let values: Vec<Vec<Sample>> = rows.into_iter().map(|r| r.values).collect();
    Ok(genex_core::SampleBlock::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rectangular_whitespace_rows() {
        let data = "1 2 3\n4 5 6\n";
        let rows = parse_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values, vec![1.0, 2.0, 3.0]);
        assert!(rows[0].name.is_none());
    }

    #[test]
    fn detects_leading_name_column() {
        let data = "item_a, 1.0, 2.0, 3.0\nitem_b, 4.0, 5.0, 6.0\n";
        let rows = parse_rows(data.as_bytes()).unwrap();
        assert_eq!(rows[0].name.as_deref(), Some("item_a"));
        assert_eq!(rows[0].values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn tolerates_ragged_rows() {
        let data = "1 2 3 4\n5 6\n";
        let rows = parse_rows(data.as_bytes()).unwrap();
        let values: Vec<Vec<Sample>> = rows.into_iter().map(|r| r.values).collect();
        let block = genex_core::SampleBlock::new(values);
        assert_eq!(block.row_len(0), 4);
        assert_eq!(block.row_len(1), 2);
        assert_eq!(block.item_length(), 2);
    }

    #[test]
    fn rejects_unparsable_literal() {
        let data = "1 2 not_a_number\n";
        assert!(parse_rows(data.as_bytes()).is_err());
    }
}
