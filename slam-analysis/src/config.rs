//! Analysis options

use crate::error::InputProblem;
use serde::{Deserialize, Serialize};

/// Options for one analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Slowest tempo considered
    pub min_bpm: u32,
    /// Fastest tempo considered
    pub max_bpm: u32,
    /// Skip chroma extraction and key correlation entirely
    pub skip_key_detection: bool,
    /// Results below this confidence (0-100) are flagged for human review
    pub confidence_threshold: u8,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_bpm: 60,
            max_bpm: 200,
            skip_key_detection: false,
            confidence_threshold: 90,
        }
    }
}

impl AnalysisOptions {
    /// Check the options are usable
    pub fn validate(&self) -> Result<(), InputProblem> {
        if self.min_bpm == 0 || self.min_bpm >= self.max_bpm {
            return Err(InputProblem::InvalidBpmRange {
                min: self.min_bpm,
                max: self.max_bpm,
            });
        }
        if self.confidence_threshold > 100 {
            return Err(InputProblem::InvalidThreshold(self.confidence_threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AnalysisOptions::default();
        assert_eq!(options.min_bpm, 60);
        assert_eq!(options.max_bpm, 200);
        assert!(!options.skip_key_detection);
        assert_eq!(options.confidence_threshold, 90);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let inverted = AnalysisOptions {
            min_bpm: 180,
            max_bpm: 90,
            ..Default::default()
        };
        assert_eq!(
            inverted.validate(),
            Err(InputProblem::InvalidBpmRange { min: 180, max: 90 })
        );

        let zero = AnalysisOptions {
            min_bpm: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let threshold = AnalysisOptions {
            confidence_threshold: 101,
            ..Default::default()
        };
        assert_eq!(threshold.validate(), Err(InputProblem::InvalidThreshold(101)));
    }
}
