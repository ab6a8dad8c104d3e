// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reduced-model reader for `MpiReplay` per-rank trace files.
//!
//! The real platform simulator replays full SMPI action traces, with actual
//! message ordering, barriers, and collective operations. This core only
//! needs enough information to size one `ptask_duration` call per job, so it
//! reads a reduced line-oriented format instead of the real SMPI trace
//! grammar: one file per rank, each line either
//!
//! ```text
//! compute <flops>
//! send <dest_rank> <bytes>
//! ```
//!
//! Blank lines and `#`-prefixed comments are skipped. Any other verb (e.g. a
//! real trace's `recv`, `sleep`, `barrier`) is ignored, since this reduced
//! model folds compute/communication volume into a single ptask rather than
//! reproducing ordering.

use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("could not read MPI replay trace `{path}`: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("MPI replay trace `{path}` line {line}: `send` needs a destination rank and a byte count")]
    MalformedSend { path: String, line: usize },
}

/// Per-rank cost extracted from one trace file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankCost {
    pub flops: f64,
    /// `(destination_rank, bytes)` for every `send` line in the trace.
    pub sends: Vec<(usize, f64)>,
}

fn parse_rank_trace(path: &str) -> Result<RankCost, TraceError> {
    let contents = fs::read_to_string(path).map_err(|e| TraceError::Unreadable { path: path.to_string(), reason: e.to_string() })?;
    let mut cost = RankCost::default();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("compute") => {
                if let Some(flops) = tokens.next().and_then(|t| t.parse::<f64>().ok()) {
                    cost.flops += flops;
                }
            }
            Some("send") => {
                let dest = tokens.next().and_then(|t| t.parse::<usize>().ok());
                let bytes = tokens.next().and_then(|t| t.parse::<f64>().ok());
                match (dest, bytes) {
                    (Some(dest), Some(bytes)) => cost.sends.push((dest, bytes)),
                    _ => return Err(TraceError::MalformedSend { path: path.to_string(), line: idx + 1 }),
                }
            }
            _ => {}
        }
    }
    Ok(cost)
}

/// Reads one trace per rank, in rank order.
pub fn load_rank_costs(trace_filenames: &[String]) -> Result<Vec<RankCost>, TraceError> {
    trace_filenames.iter().map(|path| parse_rank_trace(path)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_trace(dir: &std::path::Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).expect("create trace file");
        f.write_all(contents.as_bytes()).expect("write trace file");
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn parses_compute_and_send_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_trace(
            dir.path(),
            "rank0.txt",
            "# rank 0\ncompute 100.0\nsend 1 2048\ncompute 50.0\n",
        );
        let cost = parse_rank_trace(&path).expect("parse");
        assert!((cost.flops - 150.0).abs() < 1e-9);
        assert_eq!(cost.sends, vec![(1, 2048.0)]);
    }

    #[test]
    fn ignores_unknown_verbs_and_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_trace(dir.path(), "rank0.txt", "\nrecv 0\nbarrier\ncompute 10\n");
        let cost = parse_rank_trace(&path).expect("parse");
        assert!((cost.flops - 10.0).abs() < 1e-9);
        assert!(cost.sends.is_empty());
    }

    #[test]
    fn malformed_send_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_trace(dir.path(), "rank0.txt", "send 1\n");
        let err = parse_rank_trace(&path).unwrap_err();
        assert!(matches!(err, TraceError::MalformedSend { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = parse_rank_trace("/nonexistent/path/to/trace").unwrap_err();
        assert!(matches!(err, TraceError::Unreadable { .. }));
    }

    #[test]
    fn loads_one_cost_per_rank_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let r0 = write_trace(dir.path(), "r0.txt", "compute 1\n");
        let r1 = write_trace(dir.path(), "r1.txt", "compute 2\n");
        let costs = load_rank_costs(&[r0, r1]).expect("load");
        assert_eq!(costs.len(), 2);
        assert!((costs[0].flops - 1.0).abs() < 1e-9);
        assert!((costs[1].flops - 2.0).abs() < 1e-9);
    }
}
