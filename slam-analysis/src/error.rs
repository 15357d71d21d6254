//! Errors returned by the detection engine

use thiserror::Error;

/// Errors that can occur during analysis
///
/// Inconclusive audio is never an error: it comes back as a normal result
/// with zero confidence. Only input the engine cannot interpret fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputProblem),
}

/// What was wrong with the input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputProblem {
    #[error("sample buffer is empty")]
    EmptyBuffer,
    #[error("sample {index} is not finite")]
    NonFiniteSample { index: usize },
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("BPM range {min}-{max} is empty or contains zero")]
    InvalidBpmRange { min: u32, max: u32 },
    #[error("confidence threshold {0} is above 100")]
    InvalidThreshold(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_includes_problem() {
        let err = AnalysisError::from(InputProblem::NonFiniteSample { index: 7 });
        assert_eq!(err.to_string(), "Invalid input: sample 7 is not finite");
    }
}
