use crate::error::{HrvTrackError, Result};
use crate::models::Reading;

/// Validate readings that did not come through the CSV parser
pub struct ReadingValidator;

impl ReadingValidator {
    /// Validate a complete reading
    pub fn validate_reading(reading: &Reading) -> Result<()> {
        Self::validate_hrv(reading.hrv_ms)?;
        Self::validate_resting_hr(reading.resting_hr)?;

        if let Some(score) = reading.recovery_score {
            Self::validate_recovery_score(score)?;
        }

        Ok(())
    }

    /// HRV must be finite and non-negative, the same rule the CSV parser
    /// applies to imported rows
    pub fn validate_hrv(hrv_ms: f64) -> Result<()> {
        if !hrv_ms.is_finite() || hrv_ms < 0.0 {
            return Err(HrvTrackError::Validation(format!(
                "HRV must be a non-negative number, got: {}",
                hrv_ms
            )));
        }

        Ok(())
    }

    fn validate_resting_hr(resting_hr: f64) -> Result<()> {
        if !resting_hr.is_finite() || resting_hr < 0.0 {
            return Err(HrvTrackError::Validation(format!(
                "Resting heart rate must be a non-negative number, got: {}",
                resting_hr
            )));
        }

        Ok(())
    }

    fn validate_recovery_score(score: f64) -> Result<()> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(HrvTrackError::Validation(format!(
                "Recovery score must be between 0 and 100, got: {}",
                score
            )));
        }

        Ok(())
    }
}
