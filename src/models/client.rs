//! Client record - the 23 UCI credit-card attributes
//!
//! Categorical fields are enums that keep the raw code the classifier
//! was trained on, so projection into the feature vector is lossless.
//! Codes outside the documented sets are carried as-is, never rejected.

use serde::{Deserialize, Serialize};

use crate::utils::constants::FEATURE_COUNT;

// ============================================
// CATEGORICAL CODES
// ============================================

/// Integral value of a code, if it has one
fn integral(code: f64) -> Option<i64> {
    (code.fract() == 0.0 && code.abs() <= i32::MAX as f64).then_some(code as i64)
}

/// SEX column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    /// Outside the documented 1/2 coding
    Unlisted { code: f64 },
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    pub fn from_code(code: f64) -> Self {
        match integral(code) {
            Some(1) => Self::Male,
            Some(2) => Self::Female,
            _ => Self::Unlisted { code },
        }
    }

    pub fn code(&self) -> f64 {
        match self {
            Self::Male => 1.0,
            Self::Female => 2.0,
            Self::Unlisted { code } => *code,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unlisted { .. } => "Unlisted",
        }
    }
}

/// EDUCATION column.
///
/// The dataset documents 1-4 but also contains 0, 5 and 6. Code 0 is
/// "Unknown"; every other code displays as "Others" and keeps its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EducationLevel {
    Unknown,
    GraduateSchool,
    University,
    HighSchool,
    Other { code: f64 },
}

impl EducationLevel {
    /// Options offered by the form, in display order
    pub const FORM_OPTIONS: [EducationLevel; 5] = [
        EducationLevel::GraduateSchool,
        EducationLevel::University,
        EducationLevel::HighSchool,
        EducationLevel::Other { code: 4.0 },
        EducationLevel::Unknown,
    ];

    pub fn from_code(code: f64) -> Self {
        match integral(code) {
            Some(0) => Self::Unknown,
            Some(1) => Self::GraduateSchool,
            Some(2) => Self::University,
            Some(3) => Self::HighSchool,
            _ => Self::Other { code },
        }
    }

    pub fn code(&self) -> f64 {
        match self {
            Self::Unknown => 0.0,
            Self::GraduateSchool => 1.0,
            Self::University => 2.0,
            Self::HighSchool => 3.0,
            Self::Other { code } => *code,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::GraduateSchool => "Grad School",
            Self::University => "University",
            Self::HighSchool => "High School",
            Self::Other { .. } => "Others",
        }
    }
}

/// MARRIAGE column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaritalStatus {
    Unknown,
    Married,
    Single,
    Other,
    /// Outside the documented 0..=3 coding
    Unlisted { code: f64 },
}

impl MaritalStatus {
    pub const ALL: [MaritalStatus; 4] = [
        MaritalStatus::Unknown,
        MaritalStatus::Married,
        MaritalStatus::Single,
        MaritalStatus::Other,
    ];

    pub fn from_code(code: f64) -> Self {
        match integral(code) {
            Some(0) => Self::Unknown,
            Some(1) => Self::Married,
            Some(2) => Self::Single,
            Some(3) => Self::Other,
            _ => Self::Unlisted { code },
        }
    }

    pub fn code(&self) -> f64 {
        match self {
            Self::Unknown => 0.0,
            Self::Married => 1.0,
            Self::Single => 2.0,
            Self::Other => 3.0,
            Self::Unlisted { code } => *code,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Married => "Married",
            Self::Single => "Single",
            Self::Other => "Others",
            Self::Unlisted { .. } => "Unlisted",
        }
    }
}

/// PAY_n repayment status code.
/// -1 = paid duly, 0 = revolving credit, n > 0 = payment delayed n months.
/// The documented range is [-1, 8] but the value is passed through as-is.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
pub struct RepaymentStatus(pub f64);

impl RepaymentStatus {
    pub fn label(&self) -> String {
        let n = self.0;
        if n.is_nan() {
            "Unknown".to_string()
        } else if n < -1.0 {
            "No consumption".to_string()
        } else if n < 0.0 {
            "Paid duly".to_string()
        } else if n < 1.0 {
            "Revolving credit".to_string()
        } else if n == 1.0 {
            "Delayed 1 month".to_string()
        } else if n <= 8.0 {
            format!("Delayed {} months", n)
        } else {
            "Delayed 9+ months".to_string()
        }
    }
}

// ============================================
// CLIENT RECORD
// ============================================

/// Canonically ordered numeric encoding of a `ClientRecord`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

/// One credit-card client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub limit_bal: f64,
    pub sex: Sex,
    pub education: EducationLevel,
    pub marriage: MaritalStatus,
    pub age: f64,
    /// PAY_0, PAY_2 .. PAY_6 (September back to April)
    pub repayment_status: [RepaymentStatus; 6],
    /// BILL_AMT1 .. BILL_AMT6
    pub bill_amounts: [f64; 6],
    /// PAY_AMT1 .. PAY_AMT6
    pub payment_amounts: [f64; 6],
}

impl Default for ClientRecord {
    /// Form defaults
    fn default() -> Self {
        Self {
            limit_bal: 50_000.0,
            sex: Sex::Male,
            education: EducationLevel::GraduateSchool,
            marriage: MaritalStatus::Unknown,
            age: 30.0,
            repayment_status: [RepaymentStatus(0.0); 6],
            bill_amounts: [0.0; 6],
            payment_amounts: [0.0; 6],
        }
    }
}

impl ClientRecord {
    /// Project into the canonical 23-field order:
    /// LIMIT_BAL, SEX, EDUCATION, MARRIAGE, AGE, PAY_0..PAY_6,
    /// BILL_AMT1..6, PAY_AMT1..6
    pub fn to_feature_vector(&self) -> FeatureVector {
        let mut v = [0.0; FEATURE_COUNT];
        v[0] = self.limit_bal;
        v[1] = self.sex.code();
        v[2] = self.education.code();
        v[3] = self.marriage.code();
        v[4] = self.age;
        for i in 0..6 {
            v[5 + i] = self.repayment_status[i].0;
            v[11 + i] = self.bill_amounts[i];
            v[17 + i] = self.payment_amounts[i];
        }
        FeatureVector(v)
    }

    /// Worst repayment delay across the six months
    pub fn max_delay(&self) -> RepaymentStatus {
        self.repayment_status
            .iter()
            .copied()
            .reduce(|worst, s| if s.0 > worst.0 { s } else { worst })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distinct_record() -> ClientRecord {
        ClientRecord {
            limit_bal: 120_000.0,
            sex: Sex::Female,
            education: EducationLevel::HighSchool,
            marriage: MaritalStatus::Single,
            age: 41.0,
            repayment_status: [-1.0, 0.0, 1.0, 2.0, 3.0, 4.0].map(RepaymentStatus),
            bill_amounts: [101.0, 102.0, 103.0, 104.0, 105.0, 106.0],
            payment_amounts: [201.0, 202.0, 203.0, 204.0, 205.0, 206.0],
        }
    }

    #[test]
    fn test_feature_vector_order() {
        let v = distinct_record().to_feature_vector();
        let expected = [
            120_000.0, 2.0, 3.0, 2.0, 41.0, // identity
            -1.0, 0.0, 1.0, 2.0, 3.0, 4.0, // PAY_0, PAY_2..PAY_6
            101.0, 102.0, 103.0, 104.0, 105.0, 106.0, // BILL_AMT1..6
            201.0, 202.0, 203.0, 204.0, 205.0, 206.0, // PAY_AMT1..6
        ];
        assert_eq!(v.0, expected);
    }

    #[test]
    fn test_education_mapping() {
        assert_eq!(EducationLevel::from_code(0.0), EducationLevel::Unknown);
        assert_eq!(EducationLevel::from_code(2.0).label(), "University");
        for code in [4.0, 5.0, 6.0, 7.0, -1.0, 2.5] {
            let level = EducationLevel::from_code(code);
            assert_eq!(level.label(), "Others");
            // raw code retained for the model
            assert_eq!(level.code(), code);
        }
    }

    #[test]
    fn test_category_codes() {
        assert_eq!(Sex::from_code(2.0), Sex::Female);
        assert_eq!(MaritalStatus::from_code(3.0).label(), "Others");
        for status in MaritalStatus::ALL {
            assert_eq!(MaritalStatus::from_code(status.code()), status);
        }
        for sex in Sex::ALL {
            assert_eq!(Sex::from_code(sex.code()), sex);
        }
    }

    #[test]
    fn test_unlisted_codes_pass_through() {
        assert_eq!(Sex::from_code(0.0), Sex::Unlisted { code: 0.0 });
        assert_eq!(Sex::from_code(1.5).code(), 1.5);
        assert_eq!(MaritalStatus::from_code(4.0), MaritalStatus::Unlisted { code: 4.0 });
        assert_eq!(MaritalStatus::from_code(-3.0).code(), -3.0);

        let record = ClientRecord {
            sex: Sex::from_code(7.0),
            marriage: MaritalStatus::from_code(9.0),
            age: -1.0,
            repayment_status: [RepaymentStatus(12.0); 6],
            ..ClientRecord::default()
        };
        let v = record.to_feature_vector();
        assert_eq!(v.0[1], 7.0);
        assert_eq!(v.0[3], 9.0);
        assert_eq!(v.0[4], -1.0);
        assert_eq!(v.0[5], 12.0);
    }

    #[test]
    fn test_repayment_labels() {
        assert_eq!(RepaymentStatus(-2.0).label(), "No consumption");
        assert_eq!(RepaymentStatus(-1.0).label(), "Paid duly");
        assert_eq!(RepaymentStatus(0.0).label(), "Revolving credit");
        assert_eq!(RepaymentStatus(1.0).label(), "Delayed 1 month");
        assert_eq!(RepaymentStatus(8.0).label(), "Delayed 8 months");
        assert_eq!(RepaymentStatus(9.0).label(), "Delayed 9+ months");
    }

    #[test]
    fn test_max_delay() {
        assert_eq!(distinct_record().max_delay(), RepaymentStatus(4.0));
        assert_eq!(ClientRecord::default().max_delay(), RepaymentStatus(0.0));
    }
}
