// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Lazy parser for the samples matrix.
//!
//! The file is consumed strictly in order: two date lines, three schema
//! rows, one blank separator, then the matrix body. The parser never looks
//! ahead more than one line and is restartable only by reconstruction; the
//! `&mut self` receivers keep the three phases from running concurrently.

use crate::error::Error;
use crate::line::{LineScanner, SEPARATOR};
use rigstream_model::{Measure, Sample};
use tokio::io::AsyncBufRead;

/// Number of prefix cells before the data columns of a body row.
const OFFSET: usize = 2;

/// Cell content that marks a missing value.
const NAN: &str = "NaN";

/// The two raw date strings from the top of a samples file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Raw start date, first line.
    pub start_date: String,
    /// Raw end date, second line.
    pub end_date: String,
}

/// Streaming reader of a samples upload.
pub struct SamplesParser<R> {
    scanner: LineScanner<R>,
}

impl<R: AsyncBufRead + Unpin> SamplesParser<R> {
    /// Wraps a buffered byte stream.
    pub fn new(reader: R) -> Self {
        SamplesParser {
            scanner: LineScanner::new(reader),
        }
    }

    /// Consumes the two header lines carrying the experiment dates.
    pub async fn parse_header(&mut self) -> Result<(Header, u64), Error> {
        let (start_date, start_size) = self.parse_date_line().await?;
        let (end_date, end_size) = self.parse_date_line().await?;
        Ok((
            Header {
                start_date,
                end_date,
            },
            (start_size + end_size) as u64,
        ))
    }

    /// Consumes the three schema rows and the blank separator line.
    ///
    /// Fails when the types or units row disagrees with the names row in
    /// length.
    pub async fn parse_measures(&mut self) -> Result<(Vec<Measure>, u64), Error> {
        let (names, names_size) = self.scanner.split_line(OFFSET, 0).await?;
        let (kinds, kinds_size) = self.scanner.split_line(OFFSET, 0).await?;
        let (units, units_size) = self.scanner.split_line(OFFSET, 0).await?;

        if kinds.len() != names.len() {
            return Err(Error::SchemaLengthMismatch {
                row: "types",
                expected: names.len(),
                actual: kinds.len(),
            });
        }
        if units.len() != names.len() {
            return Err(Error::SchemaLengthMismatch {
                row: "units",
                expected: names.len(),
                actual: units.len(),
            });
        }

        // The blank separator line, counted but otherwise ignored.
        let separator_size = match self.scanner.next_line().await? {
            Some((_, size)) => size,
            None => 0,
        };

        let measures = names
            .into_iter()
            .zip(kinds)
            .zip(units)
            .enumerate()
            .map(|(index, ((name, kind), unit))| Measure {
                index,
                name,
                kind,
                unit,
            })
            .collect();

        let read = names_size + kinds_size + units_size + separator_size;
        Ok((measures, read as u64))
    }

    /// Consumes up to `limit` body lines, emitting one sample per kept cell.
    ///
    /// Empty cells and literal `NaN` cells are dropped silently. The last
    /// flag is `true` iff the stream was exhausted within this call.
    pub async fn parse_samples(
        &mut self,
        limit: usize,
    ) -> Result<(Vec<Sample>, u64, bool), Error> {
        let mut samples = Vec::new();
        let mut read: u64 = 0;

        for _ in 0..limit {
            let Some((line, size)) = self.scanner.next_line().await? else {
                return Ok((samples, read, true));
            };
            read += size as u64;
            let mut fields = line.split(SEPARATOR);
            let _prefix = fields.next();
            let Some(time_of_day) = fields.next() else {
                continue;
            };
            for (i, cell) in fields.enumerate() {
                if cell.is_empty() || cell == NAN {
                    continue;
                }
                samples.push(Sample {
                    measure_index: i,
                    time_of_day: time_of_day.to_owned(),
                    value: cell.to_owned(),
                });
            }
        }

        Ok((samples, read, false))
    }

    async fn parse_date_line(&mut self) -> Result<(String, usize), Error> {
        let (mut fields, size) = self.scanner.split_line(1, 1).await?;
        let date = fields.pop().ok_or(Error::EmptyLine)?;
        Ok((date, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    const FILE: &str = "\
_;2020-01-01T10:00:00.000
_;2020-01-01T11:00:00.000
_;_;temp;pressure
_;_;int;float
_;_;\u{b0}C;bar

_;10:00:00.000;1;2
_;10:00:01.000;;NaN
_;10:00:02.000;3;4
";

    fn parser(data: &'static str) -> SamplesParser<BufReader<&'static [u8]>> {
        SamplesParser::new(BufReader::new(data.as_bytes()))
    }

    #[tokio::test]
    async fn parses_header_dates() {
        let mut p = parser(FILE);
        let (header, read) = p.parse_header().await.unwrap();
        assert_eq!(header.start_date, "2020-01-01T10:00:00.000");
        assert_eq!(header.end_date, "2020-01-01T11:00:00.000");
        assert_eq!(read, 50);
    }

    #[tokio::test]
    async fn parses_measures_schema() {
        let mut p = parser(FILE);
        let _ = p.parse_header().await.unwrap();
        let (measures, read) = p.parse_measures().await.unwrap();
        assert_eq!(measures.len(), 2);
        assert_eq!(
            measures[0],
            Measure {
                index: 0,
                name: "temp".into(),
                kind: "int".into(),
                unit: "\u{b0}C".into(),
            }
        );
        assert_eq!(measures[1].name, "pressure");
        assert_eq!(measures[1].index, 1);
        assert!(read > 0);
    }

    #[tokio::test]
    async fn rejects_schema_length_mismatch() {
        let mut p = parser(
            "_;d1\n_;d2\n_;_;a;b;c\n_;_;int;int;int\n_;_;u;u\n\n",
        );
        let _ = p.parse_header().await.unwrap();
        let err = p.parse_measures().await.unwrap_err();
        assert!(matches!(
            err,
            Error::SchemaLengthMismatch {
                row: "units",
                expected: 3,
                actual: 2,
            }
        ));
    }

    #[tokio::test]
    async fn parses_samples_dropping_empty_and_nan() {
        let mut p = parser(FILE);
        let _ = p.parse_header().await.unwrap();
        let _ = p.parse_measures().await.unwrap();

        let (samples, read, end) = p.parse_samples(500).await.unwrap();
        assert!(end);
        assert!(read > 0);
        assert_eq!(
            samples,
            vec![
                Sample {
                    measure_index: 0,
                    time_of_day: "10:00:00.000".into(),
                    value: "1".into(),
                },
                Sample {
                    measure_index: 1,
                    time_of_day: "10:00:00.000".into(),
                    value: "2".into(),
                },
                Sample {
                    measure_index: 0,
                    time_of_day: "10:00:02.000".into(),
                    value: "3".into(),
                },
                Sample {
                    measure_index: 1,
                    time_of_day: "10:00:02.000".into(),
                    value: "4".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn batches_respect_the_limit() {
        let mut p = parser(FILE);
        let _ = p.parse_header().await.unwrap();
        let _ = p.parse_measures().await.unwrap();

        let (first, _, end) = p.parse_samples(2).await.unwrap();
        assert!(!end);
        assert_eq!(first.len(), 2);

        let (second, _, end) = p.parse_samples(2).await.unwrap();
        assert!(end);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn header_only_file_ends_immediately() {
        let mut p = parser("_;d1\n_;d2\n_;_;a\n_;_;int\n_;_;u\n\n");
        let _ = p.parse_header().await.unwrap();
        let (measures, _) = p.parse_measures().await.unwrap();
        assert_eq!(measures.len(), 1);
        let (samples, read, end) = p.parse_samples(500).await.unwrap();
        assert!(samples.is_empty());
        assert_eq!(read, 0);
        assert!(end);
    }
}
