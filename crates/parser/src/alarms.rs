// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Lazy parser for the alarms log.

use crate::error::Error;
use crate::line::{LineScanner, SEPARATOR};
use rigstream_model::Alarm;
use tokio::io::AsyncBufRead;

/// Streaming reader of an alarms upload.
///
/// Alarms are small relative to samples, so the whole log is returned as a
/// single vector rather than batched.
pub struct AlarmsParser<R> {
    scanner: LineScanner<R>,
}

impl<R: AsyncBufRead + Unpin> AlarmsParser<R> {
    /// Wraps a buffered byte stream.
    pub fn new(reader: R) -> Self {
        AlarmsParser {
            scanner: LineScanner::new(reader),
        }
    }

    /// Reads alarm lines until end of stream or the first empty line.
    ///
    /// Each line must carry at least `time;level;message`; the first field
    /// further splits on whitespace and its second token is the time of day.
    pub async fn parse_alarms(&mut self) -> Result<(Vec<Alarm>, u64), Error> {
        let mut alarms = Vec::new();
        let mut read: u64 = 0;

        while let Some((line, size)) = self.scanner.next_line().await? {
            if line.is_empty() {
                break;
            }
            read += size as u64;

            let fields: Vec<&str> = line.split(SEPARATOR).collect();
            if fields.len() < 3 {
                return Err(Error::BadAlarmLine {
                    details: format!("expected 3 fields, found {}", fields.len()),
                });
            }
            let time_tokens: Vec<&str> = fields[0].split_whitespace().collect();
            if time_tokens.len() < 2 {
                return Err(Error::BadAlarmLine {
                    details: format!("no time of day in '{}'", fields[0]),
                });
            }
            let level = fields[1]
                .parse::<i64>()
                .map_err(|_| Error::InvalidAlarmLevel {
                    value: fields[1].to_owned(),
                })?;

            alarms.push(Alarm {
                time_of_day: time_tokens[1].to_owned(),
                level,
                message: fields[2].to_owned(),
            });
        }

        Ok((alarms, read))
    }
}
