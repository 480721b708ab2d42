//! API Request/Response Types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::loader::ArtifactSource;
use crate::models::client::{ClientRecord, EducationLevel, MaritalStatus, RepaymentStatus, Sex};
use crate::models::errors::ErrorCode;
use crate::models::types::{ResultCard, RiskAssessment};
use crate::utils::telemetry::TelemetryStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ApiBadRequest.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: ErrorCode::ApiRateLimited.as_str().to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }

    /// Artifacts absent; scoring is blocked until they are provided
    pub fn service_unavailable(reason: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ArtifactMissing.as_str().to_string(),
            message: "Model artifacts not found".to_string(),
            details: Some(reason.into()),
        }
    }
}

// ============================================
// Client Input
// ============================================

/// Flat client input keyed by UCI column names.
///
/// Shared by the HTML form and the JSON endpoint. Every field is a plain
/// number; categorical codes are interpreted when converted to a
/// `ClientRecord` and out-of-range values pass through to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientForm {
    #[serde(rename = "LIMIT_BAL")]
    pub limit_bal: f64,
    #[serde(rename = "SEX")]
    pub sex: f64,
    #[serde(rename = "EDUCATION")]
    pub education: f64,
    #[serde(rename = "MARRIAGE")]
    pub marriage: f64,
    #[serde(rename = "AGE")]
    pub age: f64,

    #[serde(rename = "PAY_0")]
    pub pay_0: f64,
    #[serde(rename = "PAY_2")]
    pub pay_2: f64,
    #[serde(rename = "PAY_3")]
    pub pay_3: f64,
    #[serde(rename = "PAY_4")]
    pub pay_4: f64,
    #[serde(rename = "PAY_5")]
    pub pay_5: f64,
    #[serde(rename = "PAY_6")]
    pub pay_6: f64,

    #[serde(rename = "BILL_AMT1")]
    pub bill_amt1: f64,
    #[serde(rename = "BILL_AMT2")]
    pub bill_amt2: f64,
    #[serde(rename = "BILL_AMT3")]
    pub bill_amt3: f64,
    #[serde(rename = "BILL_AMT4")]
    pub bill_amt4: f64,
    #[serde(rename = "BILL_AMT5")]
    pub bill_amt5: f64,
    #[serde(rename = "BILL_AMT6")]
    pub bill_amt6: f64,

    #[serde(rename = "PAY_AMT1")]
    pub pay_amt1: f64,
    #[serde(rename = "PAY_AMT2")]
    pub pay_amt2: f64,
    #[serde(rename = "PAY_AMT3")]
    pub pay_amt3: f64,
    #[serde(rename = "PAY_AMT4")]
    pub pay_amt4: f64,
    #[serde(rename = "PAY_AMT5")]
    pub pay_amt5: f64,
    #[serde(rename = "PAY_AMT6")]
    pub pay_amt6: f64,
}

impl ClientForm {
    pub fn repayment_codes(&self) -> [f64; 6] {
        [self.pay_0, self.pay_2, self.pay_3, self.pay_4, self.pay_5, self.pay_6]
    }

    pub fn bill_amounts(&self) -> [f64; 6] {
        [
            self.bill_amt1,
            self.bill_amt2,
            self.bill_amt3,
            self.bill_amt4,
            self.bill_amt5,
            self.bill_amt6,
        ]
    }

    pub fn payment_amounts(&self) -> [f64; 6] {
        [
            self.pay_amt1,
            self.pay_amt2,
            self.pay_amt3,
            self.pay_amt4,
            self.pay_amt5,
            self.pay_amt6,
        ]
    }
}

impl Default for ClientForm {
    fn default() -> Self {
        Self::from(&ClientRecord::default())
    }
}

impl From<&ClientRecord> for ClientForm {
    fn from(record: &ClientRecord) -> Self {
        let pay = record.repayment_status.map(|s| s.0);
        let bill = record.bill_amounts;
        let paid = record.payment_amounts;
        Self {
            limit_bal: record.limit_bal,
            sex: record.sex.code(),
            education: record.education.code(),
            marriage: record.marriage.code(),
            age: record.age,
            pay_0: pay[0],
            pay_2: pay[1],
            pay_3: pay[2],
            pay_4: pay[3],
            pay_5: pay[4],
            pay_6: pay[5],
            bill_amt1: bill[0],
            bill_amt2: bill[1],
            bill_amt3: bill[2],
            bill_amt4: bill[3],
            bill_amt5: bill[4],
            bill_amt6: bill[5],
            pay_amt1: paid[0],
            pay_amt2: paid[1],
            pay_amt3: paid[2],
            pay_amt4: paid[3],
            pay_amt5: paid[4],
            pay_amt6: paid[5],
        }
    }
}

impl From<&ClientForm> for ClientRecord {
    fn from(form: &ClientForm) -> Self {
        ClientRecord {
            limit_bal: form.limit_bal,
            sex: Sex::from_code(form.sex),
            education: EducationLevel::from_code(form.education),
            marriage: MaritalStatus::from_code(form.marriage),
            age: form.age,
            repayment_status: form.repayment_codes().map(RepaymentStatus),
            bill_amounts: form.bill_amounts(),
            payment_amounts: form.payment_amounts(),
        }
    }
}

// ============================================
// Scoring
// ============================================

#[derive(Debug, Serialize)]
pub struct ScoreData {
    /// Raw P(default); the card carries the formatted percentage
    pub score: f64,
    #[serde(flatten)]
    pub card: ResultCard,
}

impl From<&RiskAssessment> for ScoreData {
    fn from(assessment: &RiskAssessment) -> Self {
        Self {
            score: assessment.probability,
            card: ResultCard::from(assessment),
        }
    }
}

// ============================================
// Model / Stats / Health
// ============================================

#[derive(Debug, Serialize)]
pub struct ModelInfoData {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    pub sources: Vec<ArtifactSource>,
    pub model_dir: String,
    pub feature_names: Vec<&'static str>,
    pub thresholds: BTreeMap<&'static str, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    #[serde(flatten)]
    pub telemetry: TelemetryStats,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_ready: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scenario_a_json() -> serde_json::Value {
        json!({
            "LIMIT_BAL": 50000, "SEX": 1, "EDUCATION": 2, "MARRIAGE": 1, "AGE": 30,
            "PAY_0": 0, "PAY_2": 0, "PAY_3": 0, "PAY_4": 0, "PAY_5": 0, "PAY_6": 0,
            "BILL_AMT1": 0, "BILL_AMT2": 0, "BILL_AMT3": 0,
            "BILL_AMT4": 0, "BILL_AMT5": 0, "BILL_AMT6": 0,
            "PAY_AMT1": 0, "PAY_AMT2": 0, "PAY_AMT3": 0,
            "PAY_AMT4": 0, "PAY_AMT5": 0, "PAY_AMT6": 0
        })
    }

    #[test]
    fn test_client_form_uci_names() {
        let form: ClientForm = serde_json::from_value(scenario_a_json()).unwrap();
        let record = ClientRecord::from(&form);
        assert_eq!(record.limit_bal, 50_000.0);
        assert_eq!(record.education, EducationLevel::University);
        assert_eq!(record.marriage, MaritalStatus::Married);
        assert_eq!(ClientForm::from(&record), form);
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut value = scenario_a_json();
        value.as_object_mut().unwrap().remove("PAY_AMT6");
        assert!(serde_json::from_value::<ClientForm>(value).is_err());
    }

    #[test]
    fn test_unlisted_codes_pass_through() {
        let mut value = scenario_a_json();
        value["SEX"] = json!(0);
        value["MARRIAGE"] = json!(4);
        value["EDUCATION"] = json!(9);
        value["PAY_4"] = json!(1000);
        let form: ClientForm = serde_json::from_value(value).unwrap();
        let record = ClientRecord::from(&form);
        assert_eq!(record.sex, Sex::Unlisted { code: 0.0 });
        assert_eq!(record.marriage, MaritalStatus::Unlisted { code: 4.0 });
        assert_eq!(record.education, EducationLevel::Other { code: 9.0 });
        assert_eq!(record.repayment_status[3], RepaymentStatus(1000.0));
        // lossless back to the form
        assert_eq!(ClientForm::from(&record), form);
    }

    #[test]
    fn test_out_of_range_numbers_pass_through() {
        let mut value = scenario_a_json();
        value["AGE"] = json!(-1);
        value["PAY_0"] = json!(12);
        value["LIMIT_BAL"] = json!(5_000_000);
        let record = ClientRecord::from(&serde_json::from_value::<ClientForm>(value).unwrap());
        assert_eq!(record.age, -1.0);
        assert_eq!(record.repayment_status[0], RepaymentStatus(12.0));
        assert_eq!(record.limit_bal, 5_000_000.0);

        let mut value = scenario_a_json();
        value["AGE"] = json!(30.5);
        let record = ClientRecord::from(&serde_json::from_value::<ClientForm>(value).unwrap());
        assert_eq!(record.to_feature_vector().0[4], 30.5);
    }

    #[test]
    fn test_score_data_flattens_card() {
        let data = ScoreData::from(&RiskAssessment::new(0.55));
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["risk_level"], "High");
        assert_eq!(value["score"], 0.55);
        assert_eq!(value["probability"], "55.0%");
    }
}
