use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// A row key read from the input, one per non-blank line.
pub type Identifier = i64;

#[derive(thiserror::Error, Debug)]
pub enum LineSourceError {
    #[error("Line {line_number} is not a valid identifier: {value:?}")]
    InvalidIdentifier {
        line_number: u64,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Could not read line {line_number} of the input: {source}")]
    Io {
        line_number: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Lazily yields identifiers from a line-oriented reader.
///
/// Whitespace is trimmed before the blank check and the parse. Blank lines are skipped
/// and never counted. The source is exhausted once the reader hits end of input and
/// cannot be rewound; reprocessing means opening the stream again.
pub struct LineSource<R> {
    lines: Lines<R>,
    line_number: u64,
    identifiers_read: u64,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines(), line_number: 0, identifiers_read: 0 }
    }

    /// `Ok(None)` at end of input, `Err` on the first malformed non-blank line.
    pub async fn next(&mut self) -> Result<Option<Identifier>, LineSourceError> {
        loop {
            let line_number = self.line_number + 1;
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|source| LineSourceError::Io { line_number, source })?;

            let Some(line) = line else {
                return Ok(None);
            };
            self.line_number = line_number;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let identifier = trimmed.parse::<Identifier>().map_err(|source| {
                LineSourceError::InvalidIdentifier {
                    line_number,
                    value: trimmed.to_string(),
                    source,
                }
            })?;

            self.identifiers_read += 1;
            return Ok(Some(identifier));
        }
    }

    /// Physical lines consumed so far, blank ones included.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn identifiers_read(&self) -> u64 {
        self.identifiers_read
    }
}
