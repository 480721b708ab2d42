//! Type definitions for risk assessment results

use serde::{Deserialize, Serialize};

use crate::utils::constants::{CRITICAL_THRESHOLD, HIGH_THRESHOLD, MODERATE_THRESHOLD};

/// Risk tier derived from the predicted default probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    /// p <= 0.30
    Low,
    /// 0.30 < p <= 0.50
    Moderate,
    /// 0.50 < p <= 0.70
    High,
    /// p > 0.70
    Critical,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Low,
        RiskTier::Moderate,
        RiskTier::High,
        RiskTier::Critical,
    ];

    /// Strict greater-than checks in descending order, so a probability
    /// exactly on a threshold lands in the lower tier. NaN fails every
    /// comparison and maps to `Low`.
    pub fn from_probability(p: f64) -> Self {
        if p > CRITICAL_THRESHOLD {
            Self::Critical
        } else if p > HIGH_THRESHOLD {
            Self::High
        } else if p > MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Moderate => "Moderate",
            RiskTier::High => "High",
            RiskTier::Critical => "Critical",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskTier::Low => "🟢",
            RiskTier::Moderate => "🟡",
            RiskTier::High => "🟠",
            RiskTier::Critical => "🔴",
        }
    }

    pub fn verdict(&self) -> &'static str {
        match self {
            RiskTier::Low => "✅ LOW RISK - APPROVAL RECOMMENDED",
            RiskTier::Moderate => "⚡ MODERATE RISK - CAUTION ADVISED",
            RiskTier::High => "⚠️ HIGH RISK - REQUIRES REVIEW",
            RiskTier::Critical => "⛔ CRITICAL RISK - DO NOT APPROVE",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            RiskTier::Low => "status-low",
            RiskTier::Moderate => "status-medium",
            RiskTier::High => "status-high",
            RiskTier::Critical => "status-critical",
        }
    }

    pub fn color_code(&self) -> &'static str {
        match self {
            RiskTier::Low => "#2e7d32",
            RiskTier::Moderate => "#f9a825",
            RiskTier::High => "#ef6c00",
            RiskTier::Critical => "#c62828",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one client. Computed per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// P(default) in [0, 1]
    pub probability: f64,
    pub tier: RiskTier,
}

impl RiskAssessment {
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            tier: RiskTier::from_probability(probability),
        }
    }

    /// Probability as a one-decimal percentage, e.g. "18.2%"
    pub fn probability_percent(&self) -> String {
        format!("{:.1}%", self.probability * 100.0)
    }
}

/// Presentation data for the result card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub tier: RiskTier,
    pub risk_level: &'static str,
    pub probability: String,
    pub verdict: &'static str,
    pub emoji: &'static str,
    pub css_class: &'static str,
    pub color: &'static str,
}

impl From<&RiskAssessment> for ResultCard {
    fn from(assessment: &RiskAssessment) -> Self {
        let tier = assessment.tier;
        Self {
            tier,
            risk_level: tier.as_str(),
            probability: assessment.probability_percent(),
            verdict: tier.verdict(),
            emoji: tier.emoji(),
            css_class: tier.css_class(),
            color: tier.color_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries_fall_low() {
        assert_eq!(RiskTier::from_probability(0.70), RiskTier::High);
        assert_eq!(RiskTier::from_probability(0.50), RiskTier::Moderate);
        assert_eq!(RiskTier::from_probability(0.30), RiskTier::Low);
    }

    #[test]
    fn test_tier_ranges() {
        assert_eq!(RiskTier::from_probability(0.0), RiskTier::Low);
        assert_eq!(RiskTier::from_probability(0.3000001), RiskTier::Moderate);
        assert_eq!(RiskTier::from_probability(0.5000001), RiskTier::High);
        assert_eq!(RiskTier::from_probability(0.7000001), RiskTier::Critical);
        assert_eq!(RiskTier::from_probability(1.0), RiskTier::Critical);
        assert_eq!(RiskTier::from_probability(f64::NAN), RiskTier::Low);
    }

    #[test]
    fn test_tier_partition_is_monotonic() {
        // every probability maps to one tier and tiers never go down as p rises
        let mut previous = RiskTier::Low;
        for step in 0..=1000 {
            let p = step as f64 / 1000.0;
            let tier = RiskTier::from_probability(p);
            assert!(tier >= previous, "tier dropped at p={}", p);
            previous = tier;
        }
        assert_eq!(previous, RiskTier::Critical);
    }

    #[test]
    fn test_result_card() {
        let assessment = RiskAssessment::new(0.1823);
        let card = ResultCard::from(&assessment);
        assert_eq!(card.probability, "18.2%");
        assert_eq!(card.risk_level, "Low");
        assert_eq!(card.css_class, "status-low");
        assert_eq!(card.emoji, "🟢");

        let card = ResultCard::from(&RiskAssessment::new(0.9));
        assert_eq!(card.verdict, "⛔ CRITICAL RISK - DO NOT APPROVE");
    }
}
