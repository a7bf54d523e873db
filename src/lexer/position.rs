use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// Line/column location of a byte offset in the source text.
///
/// Lines and columns are 1-based; columns count grapheme clusters so that
/// editors see the same column a user would count on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

/// Offsets of every line start in a source string.
///
/// Built once per document and used to translate segment and diagnostic
/// ranges into [`Position`]s.
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', source.as_bytes()).map(|nl| nl + 1));
        Self {
            source,
            line_starts,
        }
    }

    /// Number of lines, counting a trailing empty line after a final `\n`.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset into a position. Offsets past the end clamp to
    /// the end of the source; offsets inside a multi-byte character resolve to
    /// the start of that character's grapheme.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];

        let preceding = self.source[line_start..]
            .grapheme_indices(true)
            .take_while(|(index, grapheme)| line_start + index + grapheme.len() <= offset)
            .count();

        Position {
            line: line + 1,
            column: preceding + 1,
            offset,
        }
    }

    /// Byte range of the given 1-based line, excluding its line terminator.
    pub fn line_range(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        let end = if end > start && self.source.as_bytes()[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };
        Some((start, end))
    }
}
