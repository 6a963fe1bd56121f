use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Debug, Formatter};

/// Position in the source data
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Line number, starting with 1
    pub line: usize,
    /// Column number, starting with 1
    pub column: usize,
    /// Byte offset, starting with 0
    pub offset: usize,
}

impl Default for Location {
    /// Default to line 1, column 1
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl Location {
    /// Create a new Location
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl Debug for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.line, self.column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Keeps track of the current position in the source data. Counts columns in
/// code points, not bytes, so locations line up with what an editor shows.
#[derive(Clone, Debug, Default)]
pub struct LocationTracker {
    cur: Location,
}

impl LocationTracker {
    pub fn new(start: Location) -> Self {
        Self { cur: start }
    }

    pub fn current(&self) -> Location {
        self.cur
    }

    /// Advance the position over the given code point. Line endings must be
    /// normalized to a single line feed before reaching this point.
    pub fn advance(&mut self, c: char) {
        self.cur.offset += c.len_utf8();
        if c == '\n' {
            self.cur.line += 1;
            self.cur.column = 1;
        } else {
            self.cur.column += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_counts_lines_and_columns() {
        let mut tracker = LocationTracker::default();
        for c in "ab\ncd".chars() {
            tracker.advance(c);
        }
        let loc = tracker.current();
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 3);
        assert_eq!(loc.offset, 5);
    }
}
