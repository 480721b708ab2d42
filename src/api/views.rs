//! HTML views for the scoring form
//!
//! Pure functions from data to markup; handlers decide which one to serve.

use crate::api::types::ClientForm;
use crate::models::client::{EducationLevel, MaritalStatus, RepaymentStatus, Sex};
use crate::models::types::ResultCard;
use crate::utils::constants::{
    AGE_MAX, AGE_MIN, AMOUNT_MAX, APP_NAME, HISTORY_MONTHS, REPAYMENT_STATUS_MAX,
    REPAYMENT_STATUS_MIN,
};

const STYLE: &str = "\
body { font-family: system-ui, sans-serif; max-width: 1100px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { margin: 0; }
.subtitle { color: #666; margin: 5px 0 20px 0; font-size: 14px; }
fieldset { border: 1px solid #ddd; border-radius: 6px; margin-bottom: 1.5rem; padding: 1rem; }
.grid { display: grid; grid-template-columns: repeat(4, 1fr); gap: 1rem; }
.grid-6 { display: grid; grid-template-columns: repeat(6, 1fr); gap: 0.5rem; }
label { display: block; font-weight: bold; font-size: 0.9em; margin-bottom: 0.25rem; }
input, select { width: 100%; padding: 0.4rem; box-sizing: border-box; }
button { font-size: 1.1em; padding: 0.7rem 2rem; cursor: pointer; }
.hint { color: #666; font-size: 0.85em; }
.card { border-radius: 8px; padding: 1.5rem; margin: 2rem auto; max-width: 600px; text-align: center; color: #fff; }
.card .probability { font-size: 3em; font-weight: bold; }
.status-low { background: #28a745; }
.status-medium { background: #ffc107; color: #222; }
.status-high { background: #fd7e14; }
.status-critical { background: #dc3545; }
.error { background: #f8d7da; border: 1px solid #f5c2c7; border-radius: 6px; padding: 1rem; }
.error code { background: #fff; padding: 0.1rem 0.3rem; border-radius: 3px; }
";

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page_head(html: &mut String) {
    html.push_str("<!DOCTYPE html>\n<html><head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", APP_NAME));
    html.push_str("<style>\n");
    html.push_str(STYLE);
    html.push_str("</style>\n</head><body>\n");
    html.push_str(&format!("<h1>💳 {}</h1>\n", APP_NAME.to_uppercase()));
    html.push_str(
        "<p class=\"subtitle\">Financial risk assessment | XGBoost + StandardScaler</p>\n",
    );
}

fn number_input(html: &mut String, name: &str, label: &str, value: f64, min: f64, max: f64) {
    html.push_str(&format!(
        "<div><label for=\"{name}\">{label}</label>\
         <input type=\"number\" id=\"{name}\" name=\"{name}\" value=\"{value}\" min=\"{min}\" max=\"{max}\" step=\"1\"></div>\n",
    ));
}

fn select(html: &mut String, name: &str, label: &str, current: f64, options: &[(f64, String)]) {
    html.push_str(&format!(
        "<div><label for=\"{name}\">{label}</label><select id=\"{name}\" name=\"{name}\">"
    ));
    for (code, text) in options {
        let selected = if *code == current { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>",
            code,
            selected,
            escape_html(text)
        ));
    }
    // Keep a submitted code the widget does not list
    if !options.iter().any(|(code, _)| *code == current) {
        html.push_str(&format!(
            "<option value=\"{}\" selected>{} (unlisted)</option>",
            current, current
        ));
    }
    html.push_str("</select></div>\n");
}

fn form_section(html: &mut String, form: &ClientForm) {
    html.push_str("<form method=\"post\" action=\"/predict\">\n");

    html.push_str("<fieldset><legend><h2>📋 CLIENT INFORMATION</h2></legend><div class=\"grid\">\n");
    number_input(html, "LIMIT_BAL", "💰 Credit Limit", form.limit_bal, 0.0, AMOUNT_MAX);
    number_input(html, "AGE", "👤 Age", form.age, AGE_MIN as f64, AGE_MAX as f64);
    let sexes: Vec<(f64, String)> = Sex::ALL.iter().map(|s| (s.code(), s.label().to_string())).collect();
    select(html, "SEX", "👥 Gender", form.sex, &sexes);
    let education: Vec<(f64, String)> = EducationLevel::FORM_OPTIONS
        .iter()
        .map(|e| (e.code(), e.label().to_string()))
        .collect();
    select(html, "EDUCATION", "🎓 Education", form.education, &education);
    let marriage: Vec<(f64, String)> = MaritalStatus::ALL
        .iter()
        .map(|m| (m.code(), m.label().to_string()))
        .collect();
    select(html, "MARRIAGE", "💍 Marital Status", form.marriage, &marriage);
    html.push_str("</div></fieldset>\n");

    html.push_str("<fieldset><legend><h2>📈 PAYMENT HISTORY (Last 6 Months)</h2></legend>\n");
    html.push_str(
        "<p class=\"hint\">Payment status: -1 = paid duly, 0 = revolving credit, n = payment delayed n months</p>\n",
    );
    html.push_str("<div class=\"grid-6\">\n");
    let statuses: Vec<(f64, String)> = (REPAYMENT_STATUS_MIN..=REPAYMENT_STATUS_MAX)
        .map(|code| {
            let code = code as f64;
            (code, format!("{} ({})", code, RepaymentStatus(code).label()))
        })
        .collect();
    let pay_names = ["PAY_0", "PAY_2", "PAY_3", "PAY_4", "PAY_5", "PAY_6"];
    for ((name, month), code) in pay_names.iter().zip(HISTORY_MONTHS).zip(form.repayment_codes()) {
        select(html, name, month, code, &statuses);
    }
    html.push_str("</div></fieldset>\n");

    html.push_str("<fieldset><legend><h2>💵 FINANCIAL DETAILS</h2></legend>\n");
    html.push_str("<h4>📊 Bill Statements (NT$)</h4><div class=\"grid-6\">\n");
    for (i, (month, value)) in HISTORY_MONTHS.iter().zip(form.bill_amounts()).enumerate() {
        let name = format!("BILL_AMT{}", i + 1);
        number_input(html, &name, &format!("Bill {}", month), value, 0.0, AMOUNT_MAX);
    }
    html.push_str("</div>\n<h4>✅ Payment Amounts (NT$)</h4><div class=\"grid-6\">\n");
    for (i, (month, value)) in HISTORY_MONTHS.iter().zip(form.payment_amounts()).enumerate() {
        let name = format!("PAY_AMT{}", i + 1);
        number_input(html, &name, &format!("Paid {}", month), value, 0.0, AMOUNT_MAX);
    }
    html.push_str("</div></fieldset>\n");

    html.push_str("<p style=\"text-align: center;\"><button type=\"submit\">🔍 ANALYZE CREDIT RISK</button></p>\n");
    html.push_str("</form>\n");
}

fn result_section(html: &mut String, card: &ResultCard) {
    html.push_str(&format!("<div class=\"card {}\">\n", card.css_class));
    html.push_str(&format!(
        "<div class=\"emoji\">{}</div>\n<h2>{} RISK</h2>\n",
        card.emoji,
        card.risk_level.to_uppercase()
    ));
    html.push_str(&format!(
        "<div class=\"probability\">{}</div>\n<p>Probability of default</p>\n",
        card.probability
    ));
    html.push_str(&format!("<p><strong>{}</strong></p>\n", card.verdict));
    html.push_str("</div>\n");
}

/// Form page, optionally followed by a result card or an input error
pub fn form_page(form: &ClientForm, card: Option<&ResultCard>, input_error: Option<&str>) -> String {
    let mut html = String::new();
    page_head(&mut html);
    form_section(&mut html, form);
    if let Some(card) = card {
        result_section(&mut html, card);
    }
    if let Some(message) = input_error {
        html.push_str(&format!(
            "<div class=\"error\"><strong>Invalid input:</strong> {}</div>\n",
            escape_html(message)
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Blocking configuration error shown when artifacts are absent
pub fn artifacts_missing_page(reason: &str) -> String {
    let mut html = String::new();
    page_head(&mut html);
    html.push_str("<div class=\"error\">\n");
    html.push_str("<h2>⚠️ System Error: Model artifacts not found</h2>\n");
    html.push_str(&format!("<p>{}</p>\n", escape_html(reason)));
    html.push_str(
        "<p>Place <code>xgboost_model.json</code> (or <code>xgboost_model.ubj</code>) and \
         <code>scaler_new.json</code> in the model directory (<code>CREDIT_MODEL_DIR</code>) \
         and restart the service.</p>\n",
    );
    html.push_str("</div>\n</body></html>");
    html
}

/// Shown to a browser that exceeded the request rate
pub fn rate_limited_page(retry_after: u64) -> String {
    let mut html = String::new();
    page_head(&mut html);
    html.push_str("<div class=\"error\">\n");
    html.push_str("<h2>⏳ Too many requests</h2>\n");
    html.push_str(&format!(
        "<p>Please wait {} seconds before submitting again.</p>\n",
        retry_after
    ));
    html.push_str("</div>\n</body></html>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::RiskAssessment;
    use crate::utils::constants::FEATURE_NAMES;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<a href=\"x\">&'"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_form_has_every_feature_input() {
        let html = form_page(&ClientForm::default(), None, None);
        for name in FEATURE_NAMES {
            assert!(html.contains(&format!("name=\"{}\"", name)), "missing {}", name);
        }
        assert!(html.contains("<option value=\"1\" selected>Grad School</option>"));
        assert!(!html.contains("class=\"card"));
    }

    #[test]
    fn test_result_card_rendered() {
        let card = ResultCard::from(&RiskAssessment::new(0.82));
        let html = form_page(&ClientForm::default(), Some(&card), None);
        assert!(html.contains("card status-critical"));
        assert!(html.contains("82.0%"));
        assert!(html.contains("CRITICAL RISK"));
    }

    #[test]
    fn test_unlisted_code_stays_selected() {
        let form = ClientForm {
            sex: 0.0,
            pay_0: 12.0,
            ..ClientForm::default()
        };
        let html = form_page(&form, None, None);
        assert!(html.contains("<option value=\"0\" selected>0 (unlisted)</option>"));
        assert!(html.contains("<option value=\"12\" selected>12 (unlisted)</option>"));
        assert!(!html.contains("<option value=\"1\" selected>Male</option>"));
    }

    #[test]
    fn test_rate_limited_page() {
        let html = rate_limited_page(42);
        assert!(html.contains("Too many requests"));
        assert!(html.contains("wait 42 seconds"));
    }

    #[test]
    fn test_missing_page_escapes_reason() {
        let html = artifacts_missing_page("<script>");
        assert!(html.contains("System Error: Model artifacts not found"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<form"));
    }
}
