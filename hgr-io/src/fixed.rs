//! Fixed-vertex file format: `n` lines, each either `-1` (free) or the
//! block the vertex must end up in.

use std::fmt;
use std::io;
use std::io::BufRead;
use std::num;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    BadAssignment { lineno: usize, err: num::ParseIntError },
    NegativeBlock { lineno: usize, block: i64 },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "read error: {}", err),
            Error::BadAssignment { lineno, err } => {
                write!(f, "at line {}: bad assignment: {}", lineno, err)
            }
            Error::NegativeBlock { lineno, block } => {
                write!(f, "at line {}: block {} (only -1 means free)", lineno, block)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Per vertex, `None` for free or the required block.
pub fn read<R: BufRead>(r: R) -> Result<Vec<Option<u32>>> {
    let mut assignments = Vec::new();
    for (lineno, line) in r.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: i64 = trimmed.parse().map_err(|err| Error::BadAssignment {
            lineno: lineno + 1,
            err,
        })?;
        assignments.push(match value {
            -1 => None,
            block if block >= 0 => Some(block as u32),
            block => {
                return Err(Error::NegativeBlock {
                    lineno: lineno + 1,
                    block,
                })
            }
        });
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_free_and_fixed_vertices() {
        let assignments = read(io::Cursor::new("-1\n2\n0\n-1\n")).unwrap();
        assert_eq!(assignments, vec![None, Some(2), Some(0), None]);
    }

    #[test]
    fn rejects_negative_blocks_other_than_minus_one() {
        assert!(matches!(
            read(io::Cursor::new("-2\n")),
            Err(Error::NegativeBlock { lineno: 1, block: -2 })
        ));
    }
}
