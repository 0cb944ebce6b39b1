// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Line-oriented scanning over a buffered byte stream.

use crate::error::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Separator between fields of one line.
pub(crate) const SEPARATOR: char = ';';

/// Reads one `\n`-terminated line at a time, tracking raw byte lengths.
///
/// Byte lengths are reported without the line terminator (`\n` or `\r\n`),
/// matching the sizes the uploader can compute from its own file.
pub struct LineScanner<R> {
    reader: R,
    buf: String,
}

impl<R: AsyncBufRead + Unpin> LineScanner<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        LineScanner {
            reader,
            buf: String::new(),
        }
    }

    /// Advances to the next line.
    ///
    /// Returns `None` at end of stream, otherwise the line content without
    /// its terminator and the content's UTF-8 byte length.
    pub async fn next_line(&mut self) -> Result<Option<(&str, usize)>, Error> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if self.buf.ends_with('\n') {
            let _ = self.buf.pop();
            if self.buf.ends_with('\r') {
                let _ = self.buf.pop();
            }
        }
        Ok(Some((self.buf.as_str(), self.buf.len())))
    }

    /// Splits the next line into `;`-separated fields.
    ///
    /// The first `skip` fields are discarded and `limit` fields are kept
    /// (`limit < 1` keeps the rest of the line). An exhausted stream or an
    /// empty line is an error: the formats only place empty lines where the
    /// caller expects them and reads them explicitly.
    pub async fn split_line(
        &mut self,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<String>, usize), Error> {
        let (line, size) = self.next_line().await?.ok_or(Error::UnexpectedEof)?;
        if line.is_empty() {
            return Err(Error::EmptyLine);
        }
        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        let wanted = skip + limit;
        if fields.len() < skip || fields.len() < wanted {
            return Err(Error::FieldCount {
                expected: wanted.max(skip),
                actual: fields.len(),
            });
        }
        let end = if limit < 1 { fields.len() } else { wanted };
        let kept = fields[skip..end].iter().map(|s| (*s).to_owned()).collect();
        Ok((kept, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    fn scanner(data: &'static str) -> LineScanner<BufReader<&'static [u8]>> {
        LineScanner::new(BufReader::new(data.as_bytes()))
    }

    #[tokio::test]
    async fn next_line_strips_terminators_and_counts_bytes() {
        let mut s = scanner("abc;1\r\ndéf\nlast");
        let (line, size) = s.next_line().await.unwrap().unwrap();
        assert_eq!(line, "abc;1");
        assert_eq!(size, 5);
        let (line, size) = s.next_line().await.unwrap().unwrap();
        assert_eq!(line, "déf");
        assert_eq!(size, 4);
        let (line, _) = s.next_line().await.unwrap().unwrap();
        assert_eq!(line, "last");
        assert!(s.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn split_line_skips_and_limits() {
        let mut s = scanner("_;2020-01-01T10:00:00.000\n");
        let (fields, size) = s.split_line(1, 1).await.unwrap();
        assert_eq!(fields, vec!["2020-01-01T10:00:00.000"]);
        assert_eq!(size, 25);
    }

    #[tokio::test]
    async fn split_line_takes_rest_without_limit() {
        let mut s = scanner("_;_;a;b;c\n");
        let (fields, _) = s.split_line(2, 0).await.unwrap();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn split_line_rejects_short_lines() {
        let mut s = scanner("only\n");
        assert!(matches!(
            s.split_line(1, 1).await,
            Err(Error::FieldCount { .. })
        ));
    }

    #[tokio::test]
    async fn split_line_rejects_empty_line() {
        let mut s = scanner("\nrest\n");
        assert!(matches!(s.split_line(0, 0).await, Err(Error::EmptyLine)));
    }

    #[tokio::test]
    async fn split_line_errors_at_eof() {
        let mut s = scanner("");
        assert!(matches!(s.split_line(0, 0).await, Err(Error::UnexpectedEof)));
    }
}
