// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline step tags.
//!
//! Every stage of an ingest emits exactly one report per step, keyed by the
//! tags rendered here. The numbering mirrors the order in which a run walks
//! through its stages; samples batches carry their 1-based ordinal.

use std::fmt;

/// A stage of the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Upload accepted, report allocated.
    Init,
    /// Experiment descriptor extracted from the form.
    ExtractExperiment,
    /// Samples file part extracted.
    ExtractSamples,
    /// Alarms file part extracted.
    ExtractAlarms,
    /// Sink adapter built and pipeline primed.
    InitImport,
    /// Samples header (two date lines) parsed.
    ParseHeader,
    /// Start date string parsed into an instant.
    ParseStartDate,
    /// End date string parsed into an instant.
    ParseEndDate,
    /// Experiment descriptor persisted by the sink.
    SaveExperiment,
    /// Measure schema rows parsed.
    ParseMeasures,
    /// Measure schema persisted by the sink.
    SaveMeasures,
    /// Samples batch `n` parsed.
    ParseSamples(u64),
    /// Samples batch `n` persisted by the sink.
    SaveSamples(u64),
    /// Alarms stream parsed.
    ParseAlarms,
    /// Alarms persisted by the sink.
    SaveAlarms,
    /// Run finalized.
    End,
    /// Partially-written state compensated.
    Cancel,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Init => write!(f, "1_INIT"),
            Step::ExtractExperiment => write!(f, "2_EXTRACT_EXPERIMENT"),
            Step::ExtractSamples => write!(f, "3.1_EXTRACT_SAMPLES"),
            Step::ExtractAlarms => write!(f, "3.2_EXTRACT_ALARMS"),
            Step::InitImport => write!(f, "4_INIT_IMPORT"),
            Step::ParseHeader => write!(f, "5_PARSE_HEADER"),
            Step::ParseStartDate => write!(f, "6.1_PARSE_START_DATE"),
            Step::ParseEndDate => write!(f, "6.2_PARSE_END_DATE"),
            Step::SaveExperiment => write!(f, "7_SAVE_EXPERIMENT"),
            Step::ParseMeasures => write!(f, "8.1.1_PARSE_MEASURES"),
            Step::SaveMeasures => write!(f, "8.1.2_SAVE_MEASURES"),
            Step::ParseSamples(n) => write!(f, "8.1.3_PARSE_SAMPLES_{n}"),
            Step::SaveSamples(n) => write!(f, "8.1.4_SAVE_SAMPLES_{n}"),
            Step::ParseAlarms => write!(f, "8.2.1_PARSE_ALARMS"),
            Step::SaveAlarms => write!(f, "8.2.2_SAVE_ALARMS"),
            Step::End => write!(f, "9_END"),
            Step::Cancel => write!(f, "X_CANCEL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_tags() {
        assert_eq!(Step::Init.to_string(), "1_INIT");
        assert_eq!(Step::ExtractAlarms.to_string(), "3.2_EXTRACT_ALARMS");
        assert_eq!(Step::SaveExperiment.to_string(), "7_SAVE_EXPERIMENT");
        assert_eq!(Step::ParseAlarms.to_string(), "8.2.1_PARSE_ALARMS");
        assert_eq!(Step::End.to_string(), "9_END");
        assert_eq!(Step::Cancel.to_string(), "X_CANCEL");
    }

    #[test]
    fn renders_batch_ordinals() {
        assert_eq!(Step::ParseSamples(1).to_string(), "8.1.3_PARSE_SAMPLES_1");
        assert_eq!(Step::SaveSamples(12).to_string(), "8.1.4_SAVE_SAMPLES_12");
    }
}
