//! Streaming difference of two sorted line sequences

use std::cmp::Ordering;
use std::io;

/// Which input a [`DiffError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Left => "previous",
            Self::Right => "current",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("failed to read {side} listing: {source}")]
    Read {
        side: Side,
        #[source]
        source: io::Error,
    },

    #[error("{side} listing is not sorted: {next:?} follows {previous:?}")]
    Unsorted {
        side: Side,
        previous: String,
        next: String,
    },
}

/// One input stream with order validation and duplicate collapsing.
struct SortedInput<I> {
    side: Side,
    lines: I,
    head: Option<String>,
    last: Option<String>,
    exhausted: bool,
}

impl<I> SortedInput<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    fn new(side: Side, lines: I) -> Self {
        Self {
            side,
            lines,
            head: None,
            last: None,
            exhausted: false,
        }
    }

    fn peek(&mut self) -> Result<Option<&String>, DiffError> {
        if self.head.is_none() && !self.exhausted {
            self.head = self.pull()?;
        }
        Ok(self.head.as_ref())
    }

    fn take(&mut self) -> Result<Option<String>, DiffError> {
        self.peek()?;
        Ok(self.head.take())
    }

    fn pull(&mut self) -> Result<Option<String>, DiffError> {
        loop {
            let Some(line) = self.lines.next() else {
                self.exhausted = true;
                return Ok(None);
            };
            let line = line.map_err(|source| DiffError::Read {
                side: self.side,
                source,
            })?;
            match self.last.as_deref().map(|last| line.as_str().cmp(last)) {
                Some(Ordering::Less) => {
                    return Err(DiffError::Unsorted {
                        side: self.side,
                        previous: self.last.take().unwrap_or_default(),
                        next: line,
                    });
                }
                Some(Ordering::Equal) => continue,
                _ => {
                    self.last = Some(line.clone());
                    return Ok(Some(line));
                }
            }
        }
    }
}

/// Lines of `left` that do not occur in `right`.
///
/// Both inputs must be sorted in byte order. The merge holds one line
/// per side in memory, so arbitrarily large listings diff in constant
/// space. Out-of-order input yields [`DiffError::Unsorted`] and ends the
/// iteration, so a partial result is never mistaken for a complete one
/// by a caller that stops at the first error.
pub struct SortedSetDiff<L, R> {
    left: SortedInput<L>,
    right: SortedInput<R>,
    failed: bool,
}

impl<L, R> SortedSetDiff<L, R>
where
    L: Iterator<Item = io::Result<String>>,
    R: Iterator<Item = io::Result<String>>,
{
    pub fn new(left: L, right: R) -> Self {
        Self {
            left: SortedInput::new(Side::Left, left),
            right: SortedInput::new(Side::Right, right),
            failed: false,
        }
    }

    fn advance(&mut self) -> Result<Option<String>, DiffError> {
        loop {
            let Some(candidate) = self.left.take()? else {
                return Ok(None);
            };
            loop {
                let ordering = match self.right.peek()? {
                    None => return Ok(Some(candidate)),
                    Some(other) => candidate.cmp(other),
                };
                match ordering {
                    Ordering::Less => return Ok(Some(candidate)),
                    Ordering::Equal => {
                        self.right.take()?;
                        break;
                    }
                    Ordering::Greater => {
                        self.right.take()?;
                    }
                }
            }
        }
    }
}

impl<L, R> Iterator for SortedSetDiff<L, R>
where
    L: Iterator<Item = io::Result<String>>,
    R: Iterator<Item = io::Result<String>>,
{
    type Item = Result<String, DiffError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(line) => line.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
