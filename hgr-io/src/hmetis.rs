//! hMetis hypergraph file format decoder.
//!
//! # Format
//!
//! The first non-comment line is `m n [fmt]` where `m` is the number of
//! hyperedges, `n` the number of vertices and `fmt` one of:
//!
//! | fmt  | hyperedge weights | vertex weights |
//! |------|-------------------|----------------|
//! | 0    | no                | no             |
//! | 1    | yes               | no             |
//! | 10   | no                | yes            |
//! | 11   | yes               | yes            |
//!
//! The next `m` lines hold one hyperedge each: an optional leading integer
//! weight followed by its 1-based pin ids. When vertex weights are present,
//! `n` further lines hold one weight each. Lines starting with `%` are
//! comments. Pin ids are 1-based on disk and 0-based in memory.

use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::num;
use std::path::Path;

#[derive(Debug)]
pub enum ErrorKind {
    Io(io::Error),
    BadInteger(num::ParseIntError),
    BadHeader(String),
    BadPin { pin: u64, num_vertices: u64 },
    EmptyHyperedge,
    NonPositiveWeight(i64),
    UnexpectedEof { expected: String },
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub lineno: usize,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Io(err) => write!(f, "io error: {}", err),
            ErrorKind::BadInteger(err) => write!(f, "when parsing integer: {}", err),
            ErrorKind::BadHeader(found) => {
                write!(f, "expected header \"m n [fmt]\", found {:?}", found)
            }
            ErrorKind::BadPin { pin, num_vertices } => write!(
                f,
                "pin {} out of range, the hypergraph has {} vertices",
                pin, num_vertices
            ),
            ErrorKind::EmptyHyperedge => write!(f, "hyperedge without pins"),
            ErrorKind::NonPositiveWeight(w) => write!(f, "non-positive weight {}", w),
            ErrorKind::UnexpectedEof { expected } => {
                write!(f, "unexpected end of file, expected {}", expected)
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at line {}: {}", self.lineno, self.kind)
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error {
            kind: ErrorKind::Io(err),
            lineno: 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// In-memory form of a hypergraph file: pin ids are 0-based, weights default
/// to one when the file carries none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hypergraph {
    pub num_vertices: usize,
    pub pin_lists: Vec<Vec<u32>>,
    pub hyperedge_weights: Vec<i64>,
    pub vertex_weights: Vec<i64>,
}

impl Hypergraph {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Hypergraph> {
        let file = fs::File::open(path)?;
        parse(io::BufReader::new(file))
    }

    pub fn num_hyperedges(&self) -> usize {
        self.pin_lists.len()
    }
}

/// Reads a hypergraph; wrapping `r` in a [`io::BufReader`] is recommended.
pub fn parse<R: io::BufRead>(r: R) -> Result<Hypergraph> {
    let mut lines = ContentLines::new(r);

    let (header, lineno) = lines.next_content_line()?.ok_or(Error {
        kind: ErrorKind::UnexpectedEof {
            expected: "header".into(),
        },
        lineno: 0,
    })?;
    let fields = integers_of(&header, lineno)?;
    let (m, n, fmt) = match fields.as_slice() {
        [m, n] if *m >= 0 && *n >= 0 => (*m, *n, 0),
        [m, n, fmt] if *m >= 0 && *n >= 0 && matches!(*fmt, 0 | 1 | 10 | 11) => {
            (*m, *n, *fmt)
        }
        _ => {
            return Err(Error {
                kind: ErrorKind::BadHeader(header),
                lineno,
            })
        }
    };
    let has_hyperedge_weights = fmt == 1 || fmt == 11;
    let has_vertex_weights = fmt == 10 || fmt == 11;
    let (m, n) = (m as usize, n as usize);

    let mut pin_lists = Vec::with_capacity(m);
    let mut hyperedge_weights = Vec::with_capacity(m);
    for _ in 0..m {
        let (line, lineno) = lines.next_content_line()?.ok_or(Error {
            kind: ErrorKind::UnexpectedEof {
                expected: "a hyperedge line".into(),
            },
            lineno: 0,
        })?;
        let mut fields = integers_of(&line, lineno)?;
        let weight = if has_hyperedge_weights {
            if fields.is_empty() {
                return Err(Error {
                    kind: ErrorKind::EmptyHyperedge,
                    lineno,
                });
            }
            fields.remove(0)
        } else {
            1
        };
        if weight <= 0 {
            return Err(Error {
                kind: ErrorKind::NonPositiveWeight(weight),
                lineno,
            });
        }
        if fields.is_empty() {
            return Err(Error {
                kind: ErrorKind::EmptyHyperedge,
                lineno,
            });
        }
        let mut pins = Vec::with_capacity(fields.len());
        for pin in fields {
            if pin < 1 || pin as usize > n {
                return Err(Error {
                    kind: ErrorKind::BadPin {
                        pin: pin.max(0) as u64,
                        num_vertices: n as u64,
                    },
                    lineno,
                });
            }
            pins.push(pin as u32 - 1);
        }
        hyperedge_weights.push(weight);
        pin_lists.push(pins);
    }

    let mut vertex_weights = vec![1; n];
    if has_vertex_weights {
        for weight in vertex_weights.iter_mut() {
            let (line, lineno) = lines.next_content_line()?.ok_or(Error {
                kind: ErrorKind::UnexpectedEof {
                    expected: "a vertex weight line".into(),
                },
                lineno: 0,
            })?;
            let fields = integers_of(&line, lineno)?;
            let w = *fields.first().ok_or(Error {
                kind: ErrorKind::BadHeader(line.clone()),
                lineno,
            })?;
            if w <= 0 {
                return Err(Error {
                    kind: ErrorKind::NonPositiveWeight(w),
                    lineno,
                });
            }
            *weight = w;
        }
    }

    Ok(Hypergraph {
        num_vertices: n,
        pin_lists,
        hyperedge_weights,
        vertex_weights,
    })
}

/// Line reader that skips blanks and `%` comments and counts line numbers.
struct ContentLines<R> {
    reader: R,
    lineno: usize,
}

impl<R: io::BufRead> ContentLines<R> {
    fn new(reader: R) -> Self {
        ContentLines { reader, lineno: 0 }
    }

    fn next_content_line(&mut self) -> Result<Option<(String, usize)>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.lineno += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }
            return Ok(Some((trimmed.to_owned(), self.lineno)));
        }
    }
}

fn integers_of(line: &str, lineno: usize) -> Result<Vec<i64>> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<i64>().map_err(|err| Error {
                kind: ErrorKind::BadInteger(err),
                lineno,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(s: &str) -> Result<Hypergraph> {
        parse(io::Cursor::new(s))
    }

    #[test]
    fn parses_the_unweighted_manual_example() {
        let hg = parse_str("4 7\n1 3\n1 2 4 5\n4 5 7\n3 6 7\n").unwrap();
        assert_eq!(hg.num_vertices, 7);
        assert_eq!(hg.num_hyperedges(), 4);
        assert_eq!(
            hg.pin_lists,
            vec![vec![0, 2], vec![0, 1, 3, 4], vec![3, 4, 6], vec![2, 5, 6]]
        );
        assert_eq!(hg.hyperedge_weights, vec![1; 4]);
        assert_eq!(hg.vertex_weights, vec![1; 7]);
    }

    #[test]
    fn parses_hyperedge_weights_with_fmt_1() {
        let hg = parse_str("2 3 1\n7 1 2\n9 2 3\n").unwrap();
        assert_eq!(hg.hyperedge_weights, vec![7, 9]);
        assert_eq!(hg.pin_lists, vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn parses_vertex_weights_with_fmt_10_and_11() {
        let hg = parse_str("1 2 10\n1 2\n5\n6\n").unwrap();
        assert_eq!(hg.vertex_weights, vec![5, 6]);
        assert_eq!(hg.hyperedge_weights, vec![1]);

        let hg = parse_str("1 2 11\n3 1 2\n5\n6\n").unwrap();
        assert_eq!(hg.vertex_weights, vec![5, 6]);
        assert_eq!(hg.hyperedge_weights, vec![3]);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let hg = parse_str("% a comment\n\n2 2\n% another\n1 2\n\n2 1\n").unwrap();
        assert_eq!(hg.num_hyperedges(), 2);
    }

    #[test]
    fn reports_line_numbers_on_errors() {
        let err = parse_str("1 2\n1 5\n").unwrap_err();
        assert_eq!(err.lineno, 2);
        assert!(matches!(err.kind, ErrorKind::BadPin { pin: 5, .. }));

        let err = parse_str("2 2\n1 2\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnexpectedEof { .. }));

        let err = parse_str("1 2 3\n1 2\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BadHeader(_)));

        let err = parse_str("1 2 1\n0 1 2\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NonPositiveWeight(0)));
    }
}
