//! Run-file and topics I/O.
//!
//! # Formats
//!
//! ```text
//! TREC     {qid} Q0 {docid} {rank} {score:.6} {tag}
//! MS MARCO {qid}\t{docid}\t{rank}
//! topics   {qid}\t{query}
//! ```
//!
//! Ranks written are 1-based and contiguous per query. When reading a TREC
//! run the rank column is ignored and each query's list is re-sorted by
//! score, so a hand-edited run cannot break the ranked-list invariants.

use crate::error::ErrorCode;
use crate::model::{RankedList, ScoredDocument};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;

/// Per-query ranked lists, keyed by query id.
pub type Run = BTreeMap<String, RankedList>;

/// Errors reading run or topics files.
#[derive(Debug, thiserror::Error)]
pub enum RunFileError {
    #[error("run file I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line did not match the expected column layout.
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl RunFileError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(err) if err.kind() == io::ErrorKind::NotFound => ErrorCode::InputNotFound,
            Self::Io(_) => ErrorCode::InternalUnexpected,
            Self::Malformed { .. } => ErrorCode::RunFileMalformed,
        }
    }
}

/// On-disk layout for written runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Trec,
    #[serde(alias = "msmarco")]
    MsMarco,
}

impl OutputFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trec => "trec",
            Self::MsMarco => "msmarco",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trec" => Ok(Self::Trec),
            "msmarco" | "ms-marco" => Ok(Self::MsMarco),
            other => Err(format!("unknown output format `{other}`")),
        }
    }
}

/// Format one TREC run line (without trailing newline).
#[must_use]
pub fn trec_line(qid: &str, docid: &str, rank: usize, score: f64, tag: &str) -> String {
    format!("{qid} Q0 {docid} {rank} {score:.6} {tag}")
}

/// Write one query's ranked list.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_ranked_list<W: Write>(
    w: &mut W,
    qid: &str,
    list: &RankedList,
    format: OutputFormat,
    tag: &str,
) -> io::Result<()> {
    for (idx, doc) in list.iter().enumerate() {
        let rank = idx + 1;
        match format {
            OutputFormat::Trec => writeln!(w, "{}", trec_line(qid, &doc.docid, rank, doc.score, tag))?,
            OutputFormat::MsMarco => writeln!(w, "{qid}\t{}\t{rank}", doc.docid)?,
        }
    }
    Ok(())
}

/// Write a whole run in query-id order.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_run<W: Write>(w: &mut W, run: &Run, format: OutputFormat, tag: &str) -> io::Result<()> {
    for (qid, list) in run {
        write_ranked_list(w, qid, list, format, tag)?;
    }
    Ok(())
}

/// Parse a TREC run.
///
/// Blank lines are skipped. Every other line must have exactly six
/// whitespace-separated columns with a finite numeric score.
///
/// # Errors
///
/// Returns [`RunFileError::Malformed`] naming the first bad line, or
/// [`RunFileError::Io`] if reading fails.
pub fn read_trec_run<R: BufRead>(reader: R) -> Result<Run, RunFileError> {
    let mut hits: BTreeMap<String, Vec<ScoredDocument>> = BTreeMap::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let cols: Vec<&str> = line.split_whitespace().collect();
        let [qid, _q0, docid, rank, score, _tag] = cols.as_slice() else {
            return Err(RunFileError::Malformed {
                line: line_no,
                reason: format!("expected 6 columns, found {}", cols.len()),
            });
        };
        if rank.parse::<usize>().is_err() {
            return Err(RunFileError::Malformed {
                line: line_no,
                reason: format!("rank `{rank}` is not a non-negative integer"),
            });
        }
        let score: f64 = score.parse().map_err(|_| RunFileError::Malformed {
            line: line_no,
            reason: format!("score `{score}` is not a number"),
        })?;
        if !score.is_finite() {
            return Err(RunFileError::Malformed {
                line: line_no,
                reason: format!("score `{score}` is not finite"),
            });
        }

        hits.entry((*qid).to_string())
            .or_default()
            .push(ScoredDocument::new(*docid, score));
    }

    Ok(hits
        .into_iter()
        .map(|(qid, docs)| (qid, RankedList::new(docs)))
        .collect())
}

/// Read a TREC run file from disk.
///
/// # Errors
///
/// See [`read_trec_run`].
pub fn read_trec_run_file(path: &Path) -> Result<Run, RunFileError> {
    read_trec_run(BufReader::new(File::open(path)?))
}

/// Parse a `qid<TAB>query` topics file, keeping file order.
///
/// # Errors
///
/// Returns [`RunFileError::Malformed`] for a line without a tab or with an
/// empty id, or [`RunFileError::Io`] if reading fails.
pub fn read_topics<R: BufRead>(reader: R) -> Result<Vec<(String, String)>, RunFileError> {
    let mut topics = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some((qid, query)) = line.split_once('\t') else {
            return Err(RunFileError::Malformed {
                line: idx + 1,
                reason: "expected `qid<TAB>query`".into(),
            });
        };
        let qid = qid.trim();
        if qid.is_empty() {
            return Err(RunFileError::Malformed {
                line: idx + 1,
                reason: "empty query id".into(),
            });
        }
        topics.push((qid.to_string(), query.trim().to_string()));
    }
    Ok(topics)
}

/// Read a topics file from disk.
///
/// # Errors
///
/// See [`read_topics`].
pub fn read_topics_file(path: &Path) -> Result<Vec<(String, String)>, RunFileError> {
    read_topics(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(pairs: &[(&str, f64)]) -> RankedList {
        pairs
            .iter()
            .map(|(id, score)| ScoredDocument::new(*id, *score))
            .collect()
    }

    #[test]
    fn trec_line_uses_six_decimals() {
        assert_eq!(
            trec_line("q1", "doc7", 3, 0.123_456_789, "bm25"),
            "q1 Q0 doc7 3 0.123457 bm25"
        );
    }

    #[test]
    fn write_trec_ranks_are_contiguous() {
        let mut run = Run::new();
        run.insert("q2".into(), list(&[("a", 2.0), ("b", 1.0)]));
        run.insert("q1".into(), list(&[("c", 0.5)]));

        let mut out = Vec::new();
        write_run(&mut out, &run, OutputFormat::Trec, "tag").unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "q1 Q0 c 1 0.500000 tag\nq2 Q0 a 1 2.000000 tag\nq2 Q0 b 2 1.000000 tag\n"
        );
    }

    #[test]
    fn write_msmarco_format() {
        let mut out = Vec::new();
        write_ranked_list(
            &mut out,
            "q1",
            &list(&[("a", 2.0), ("b", 1.0)]),
            OutputFormat::MsMarco,
            "ignored",
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "q1\ta\t1\nq1\tb\t2\n");
    }

    #[test]
    fn read_trec_groups_and_sorts_per_query() {
        let input = "q1 Q0 d2 2 1.5 run\nq1 Q0 d1 1 3.0 run\n\nq2 Q0 d9 1 -0.25 run\n";
        let run = read_trec_run(input.as_bytes()).unwrap();

        assert_eq!(run.len(), 2);
        assert_eq!(run["q1"].docids().collect::<Vec<_>>(), ["d1", "d2"]);
        assert!((run["q2"].docs()[0].score + 0.25).abs() < 1e-12);
    }

    #[test]
    fn read_trec_reports_bad_column_count() {
        let err = read_trec_run("q1 Q0 d1 1 2.0 tag\nq1 Q0 d2 2\n".as_bytes()).unwrap_err();
        match err {
            RunFileError::Malformed { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("6 columns"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn read_trec_reports_bad_score() {
        let err = read_trec_run("q1 Q0 d1 1 high tag\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn read_trec_rejects_non_finite_score() {
        for bad in ["NaN", "inf", "-inf"] {
            let input = format!("q1 Q0 d1 1 {bad} tag\n");
            let err = read_trec_run(input.as_bytes()).unwrap_err();
            assert!(err.to_string().contains("not finite"), "{bad}: {err}");
        }
    }

    #[test]
    fn read_topics_keeps_order() {
        let topics = read_topics("2\tsecond query\n\n1\tfirst query \n".as_bytes()).unwrap();
        assert_eq!(
            topics,
            vec![
                ("2".to_string(), "second query".to_string()),
                ("1".to_string(), "first query".to_string()),
            ]
        );
    }

    #[test]
    fn read_topics_requires_tab() {
        assert!(read_topics("1 no tab here\n".as_bytes()).is_err());
        assert!(read_topics("\tmissing id\n".as_bytes()).is_err());
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("trec".parse::<OutputFormat>().unwrap(), OutputFormat::Trec);
        assert_eq!("MSMARCO".parse::<OutputFormat>().unwrap(), OutputFormat::MsMarco);
        assert!("kilt".parse::<OutputFormat>().is_err());
    }
}
