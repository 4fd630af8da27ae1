use serde::Serialize;
use std::fmt;

/// Threshold above which a correlation counts as "strong" for display contrast.
pub const STRONG_CORRELATION: f64 = 0.6;

/// Risk score above which a portfolio is rated high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;

/// Risk score above which a portfolio is rated moderate risk.
pub const MODERATE_RISK_THRESHOLD: f64 = 0.4;

/// Eleven ordered buckets covering `[-1, 1]`, from perfect positive down to
/// very strong negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CorrelationBucket {
    Perfect,
    VeryStrongPositive,
    StrongPositive,
    ModeratePositive,
    WeakPositive,
    VeryWeakPositive,
    VeryWeakNegative,
    WeakNegative,
    ModerateNegative,
    StrongNegative,
    VeryStrongNegative,
}

impl CorrelationBucket {
    pub const ALL: [CorrelationBucket; 11] = [
        Self::Perfect,
        Self::VeryStrongPositive,
        Self::StrongPositive,
        Self::ModeratePositive,
        Self::WeakPositive,
        Self::VeryWeakPositive,
        Self::VeryWeakNegative,
        Self::WeakNegative,
        Self::ModerateNegative,
        Self::StrongNegative,
        Self::VeryStrongNegative,
    ];

    /// Position in [`Self::ALL`]; palettes are indexed by it.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect",
            Self::VeryStrongPositive => "Very strong positive",
            Self::StrongPositive => "Strong positive",
            Self::ModeratePositive => "Moderate positive",
            Self::WeakPositive => "Weak positive",
            Self::VeryWeakPositive => "Very weak positive",
            Self::VeryWeakNegative => "Very weak negative",
            Self::WeakNegative => "Weak negative",
            Self::ModerateNegative => "Moderate negative",
            Self::StrongNegative => "Strong negative",
            Self::VeryStrongNegative => "Very strong negative",
        }
    }
}

/// Buckets a correlation value. Thresholds are checked from the top down;
/// NaN lands in the last bucket.
pub fn classify_correlation(value: f64) -> CorrelationBucket {
    use CorrelationBucket::*;

    if value == 1.0 {
        Perfect
    } else if value > 0.8 {
        VeryStrongPositive
    } else if value > 0.6 {
        StrongPositive
    } else if value > 0.4 {
        ModeratePositive
    } else if value > 0.2 {
        WeakPositive
    } else if value > 0.0 {
        VeryWeakPositive
    } else if value > -0.2 {
        VeryWeakNegative
    } else if value > -0.4 {
        WeakNegative
    } else if value > -0.6 {
        ModerateNegative
    } else if value > -0.8 {
        StrongNegative
    } else {
        VeryStrongNegative
    }
}

pub fn is_strong(value: f64) -> bool {
    value.abs() > STRONG_CORRELATION
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify_risk(score: f64) -> RiskLevel {
    if score > HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if score > MODERATE_RISK_THRESHOLD {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::CorrelationBucket::*;

    #[test]
    fn test_classify_risk() {
        assert_eq!(classify_risk(0.75), RiskLevel::High);
        assert_eq!(classify_risk(0.5), RiskLevel::Moderate);
        assert_eq!(classify_risk(0.1), RiskLevel::Low);
        assert_eq!(classify_risk(0.75).to_string(), "High");
    }

    #[test]
    fn test_risk_thresholds_are_exclusive() {
        assert_eq!(classify_risk(0.7), RiskLevel::Moderate);
        assert_eq!(classify_risk(0.4), RiskLevel::Low);
        assert_eq!(classify_risk(-1.0), RiskLevel::Low);
    }

    #[test]
    fn test_correlation_buckets() {
        let cases = [
            (1.0, Perfect),
            (0.95, VeryStrongPositive),
            (0.8, StrongPositive),
            (0.61, StrongPositive),
            (0.5, ModeratePositive),
            (0.3, WeakPositive),
            (0.01, VeryWeakPositive),
            (0.0, VeryWeakNegative),
            (-0.1, VeryWeakNegative),
            (-0.2, WeakNegative),
            (-0.5, ModerateNegative),
            (-0.7, StrongNegative),
            (-0.8, VeryStrongNegative),
            (-1.0, VeryStrongNegative),
        ];
        for (value, expected) in cases {
            assert_eq!(classify_correlation(value), expected, "value {}", value);
        }
    }

    #[test]
    fn test_drift_above_one_is_not_perfect() {
        assert_eq!(classify_correlation(1.0000000000000002), VeryStrongPositive);
        assert_eq!(classify_correlation(f64::NAN), VeryStrongNegative);
    }

    #[test]
    fn test_bucket_indices_follow_order() {
        for (i, bucket) in CorrelationBucket::ALL.iter().enumerate() {
            assert_eq!(bucket.index(), i);
        }
    }

    #[test]
    fn test_is_strong() {
        assert!(is_strong(0.61));
        assert!(is_strong(-0.7));
        assert!(!is_strong(0.6));
    }
}
