//! Partition file format: `n` lines, each holding the block id of the
//! corresponding vertex in its original order.

use std::fmt;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::num;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    BadBlock { lineno: usize, err: num::ParseIntError },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "read/write error: {}", err),
            Error::BadBlock { lineno, err } => {
                write!(f, "at line {}: bad block id: {}", lineno, err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::BadBlock { err, .. } => Some(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Wrapping `w` in a [`io::BufWriter`] is recommended.
pub fn write<W: Write>(mut w: W, partition: &[u32]) -> Result<()> {
    for block in partition {
        writeln!(w, "{}", block)?;
    }
    Ok(())
}

/// Wrapping `r` in a [`io::BufReader`] is recommended.
pub fn read<R: BufRead>(r: R) -> Result<Vec<u32>> {
    let mut partition = Vec::new();
    for (lineno, line) in r.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let block = trimmed.parse().map_err(|err| Error::BadBlock {
            lineno: lineno + 1,
            err,
        })?;
        partition.push(block);
    }
    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text() {
        let partition = vec![0, 0, 1, 0, 0, 1, 1];
        let mut buffer = Vec::new();
        write(&mut buffer, &partition).unwrap();
        assert_eq!(buffer, b"0\n0\n1\n0\n0\n1\n1\n");
        assert_eq!(read(io::Cursor::new(buffer)).unwrap(), partition);
    }

    #[test]
    fn rejects_garbage_with_a_line_number() {
        let err = read(io::Cursor::new("0\nx\n")).unwrap_err();
        assert!(matches!(err, Error::BadBlock { lineno: 2, .. }));
    }
}
