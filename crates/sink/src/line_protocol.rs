// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Line Protocol encoding for the time-series backend.
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp
//! ```
//!
//! Commas, spaces and equal signs in identifiers are escaped with a
//! backslash; string field values are double-quoted with inner quotes and
//! backslashes escaped.

use std::fmt::Write as _;

/// A value that can be stored in a backend field.
#[derive(Debug, Clone)]
pub(crate) enum FieldValue {
    /// 64-bit signed integer, written with the `i` suffix.
    Integer(i64),
    /// UTF-8 string, written double-quoted.
    String(String),
}

impl FieldValue {
    fn encode(&self, out: &mut String) {
        match self {
            FieldValue::Integer(v) => {
                let _ = write!(out, "{v}i");
            }
            FieldValue::String(v) => {
                out.push('"');
                for ch in v.chars() {
                    if ch == '\\' || ch == '"' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push('"');
            }
        }
    }
}

fn escape_ident(value: &str, out: &mut String) {
    for ch in value.chars() {
        if matches!(ch, ',' | ' ' | '=') {
            out.push('\\');
        }
        out.push(ch);
    }
}

/// Encodes one point. `fields` must not be empty; the backend rejects
/// field-less points, so callers never build them.
pub(crate) fn encode_point(
    measurement: &str,
    tags: &[(&str, &str)],
    fields: &[(&str, FieldValue)],
    timestamp: i64,
) -> String {
    let mut line = String::new();
    escape_ident(measurement, &mut line);
    for (key, value) in tags {
        line.push(',');
        escape_ident(key, &mut line);
        line.push('=');
        escape_ident(value, &mut line);
    }
    line.push(' ');
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        escape_ident(key, &mut line);
        line.push('=');
        value.encode(&mut line);
    }
    let _ = write!(line, " {timestamp}");
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_tags_and_string_fields() {
        let line = encode_point(
            "experiments",
            &[("id", "abc-1")],
            &[
                ("name", FieldValue::String("thermal sweep".into())),
                ("level", FieldValue::Integer(2)),
            ],
            1_577_872_800_000,
        );
        assert_eq!(
            line,
            "experiments,id=abc-1 name=\"thermal sweep\",level=2i 1577872800000"
        );
    }

    #[test]
    fn escapes_identifiers_and_quotes() {
        let line = encode_point(
            "m easure",
            &[("tag key", "a,b=c")],
            &[("value", FieldValue::String("say \"hi\"".into()))],
            7,
        );
        assert_eq!(
            line,
            "m\\ easure,tag\\ key=a\\,b\\=c value=\"say \\\"hi\\\"\" 7"
        );
    }
}
