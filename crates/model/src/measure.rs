// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! The schema of one column in the samples matrix.

use serde::{Deserialize, Serialize};

/// One physical quantity definition from the samples header.
///
/// Built once from the three schema rows (names, types, units) and read-only
/// afterwards. Samples point back at their measure through `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    /// 0-based column position, after the 2-cell row prefix.
    pub index: usize,
    /// Measure name.
    pub name: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Physical unit.
    pub unit: String,
}
