//! Risk Scorer
//!
//! record -> canonical feature vector -> scaler -> classifier -> tier.
//! Pure function of (record, artifacts).

use tracing::debug;

use crate::core::loader::ModelArtifacts;
use crate::core::scaler::ScaledFeatures;
use crate::core::xgboost::XgbClassifier;
use crate::models::client::ClientRecord;
use crate::models::types::RiskAssessment;

/// A fitted binary classifier
pub trait Classifier: Send + Sync {
    /// P(default) for one standardized feature vector
    fn predict_proba(&self, features: &ScaledFeatures) -> f64;

    /// Short description for logs and the model endpoint
    fn describe(&self) -> String;
}

impl Classifier for XgbClassifier {
    fn predict_proba(&self, features: &ScaledFeatures) -> f64 {
        XgbClassifier::predict_proba(self, features)
    }

    fn describe(&self) -> String {
        format!(
            "XGBoost {} gbtree ({} trees, {})",
            self.version(),
            self.num_trees(),
            self.objective()
        )
    }
}

/// Score one client against loaded artifacts
pub fn score(record: &ClientRecord, artifacts: &ModelArtifacts) -> RiskAssessment {
    let features = record.to_feature_vector();
    let scaled = artifacts.scaler().transform(&features);
    let raw = artifacts.classifier().predict_proba(&scaled);

    // NaN passes through and lands in the Low tier
    let probability = if raw.is_nan() { raw } else { raw.clamp(0.0, 1.0) };
    let assessment = RiskAssessment::new(probability);

    debug!(
        probability = assessment.probability,
        tier = %assessment.tier,
        max_delay = record.max_delay().0,
        "Client scored"
    );
    assessment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scaler::StandardScaler;
    use crate::models::client::{EducationLevel, MaritalStatus, RepaymentStatus, Sex};
    use crate::models::types::RiskTier;
    use crate::utils::constants::FEATURE_COUNT;
    use std::sync::Arc;

    /// Logistic model with a distinct weight per feature position
    struct PositionalLogit {
        weights: [f64; FEATURE_COUNT],
    }

    impl Classifier for PositionalLogit {
        fn predict_proba(&self, features: &ScaledFeatures) -> f64 {
            let z: f64 = features.0.iter().zip(self.weights.iter()).map(|(x, w)| x * w).sum();
            1.0 / (1.0 + (-z).exp())
        }

        fn describe(&self) -> String {
            "positional logit".to_string()
        }
    }

    /// Always returns the same probability
    struct Fixed(f64);

    impl Classifier for Fixed {
        fn predict_proba(&self, _features: &ScaledFeatures) -> f64 {
            self.0
        }

        fn describe(&self) -> String {
            format!("fixed {}", self.0)
        }
    }

    fn identity_scaler() -> Arc<StandardScaler> {
        Arc::new(StandardScaler::new([0.0; FEATURE_COUNT], [1.0; FEATURE_COUNT]))
    }

    fn artifacts_with(classifier: impl Classifier + 'static) -> ModelArtifacts {
        ModelArtifacts::new(Arc::new(classifier), identity_scaler())
    }

    fn positional_artifacts() -> ModelArtifacts {
        let mut weights = [0.0; FEATURE_COUNT];
        for (i, w) in weights.iter_mut().enumerate() {
            *w = (i as f64 + 1.0) * 1e-3;
        }
        artifacts_with(PositionalLogit { weights })
    }

    fn distinct_record() -> ClientRecord {
        ClientRecord {
            limit_bal: 30.0,
            sex: Sex::Female,
            education: EducationLevel::HighSchool,
            marriage: MaritalStatus::Married,
            age: 25.0,
            repayment_status: [-1.0, 0.0, 4.0, 5.0, 6.0, 7.0].map(RepaymentStatus),
            bill_amounts: [8.0, 9.0, 10.0, 11.0, 12.0, 13.0],
            payment_amounts: [14.0, 15.0, 16.0, 17.0, 18.0, 19.0],
        }
    }

    #[test]
    fn test_score_is_deterministic() {
        let artifacts = positional_artifacts();
        let record = distinct_record();
        let first = score(&record, &artifacts);
        for _ in 0..10 {
            assert_eq!(score(&record, &artifacts), first);
        }
    }

    #[test]
    fn test_field_order_is_load_bearing() {
        let artifacts = positional_artifacts();
        let features = distinct_record().to_feature_vector();
        let baseline = artifacts
            .classifier()
            .predict_proba(&artifacts.scaler().transform(&features));

        for i in 0..FEATURE_COUNT {
            for j in (i + 1)..FEATURE_COUNT {
                if features.0[i] == features.0[j] {
                    continue;
                }
                let mut swapped = features;
                swapped.0.swap(i, j);
                let p = artifacts
                    .classifier()
                    .predict_proba(&artifacts.scaler().transform(&swapped));
                assert_ne!(p, baseline, "swapping {} and {} went unnoticed", i, j);
            }
        }
    }

    #[test]
    fn test_threshold_boundaries_through_scorer() {
        let record = ClientRecord::default();
        let cases = [
            (0.70, RiskTier::High),
            (0.50, RiskTier::Moderate),
            (0.30, RiskTier::Low),
            (0.71, RiskTier::Critical),
        ];
        for (p, tier) in cases {
            let assessment = score(&record, &artifacts_with(Fixed(p)));
            assert_eq!(assessment.tier, tier, "p = {}", p);
        }
    }

    #[test]
    fn test_probability_clamped() {
        let record = ClientRecord::default();
        assert_eq!(score(&record, &artifacts_with(Fixed(1.2))).probability, 1.0);
        assert_eq!(score(&record, &artifacts_with(Fixed(-0.1))).probability, 0.0);
        assert_eq!(score(&record, &artifacts_with(Fixed(f64::NAN))).tier, RiskTier::Low);
    }
}
