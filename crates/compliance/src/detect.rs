//! Pattern detection over the input tree.
//!
//! Detection is substring matching over the JSON-stringified, lowercased
//! input, exactly as observable from the outside: a field named
//! `password_policy_version` does match the `password` secret marker. The
//! squashed haystack additionally strips `_`, `-` and spaces so that
//! camelCase, snake_case and spaced phrasings all hit the same token.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email regex"));
static EMIRATES_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"784-[0-9]{4}-[0-9]{7}-[0-9]").expect("emirates id regex"));
static UAE_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\+971|00971|0)5[0-9]{8}").expect("uae phone regex"));
static PASSPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-z][0-9]{6,8}\b").expect("passport regex"));

/// Personally-identifying pattern families detected in inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiType {
    Email,
    EmiratesId,
    Phone,
    Passport,
}

impl fmt::Display for PiiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PiiType::Email => "email",
            PiiType::EmiratesId => "emirates-id",
            PiiType::Phone => "phone",
            PiiType::Passport => "passport",
        };
        f.write_str(s)
    }
}

/// The lowercased JSON haystack a checker scans.
#[must_use]
pub fn haystack(input: &Value) -> String {
    serde_json::to_string(input).unwrap_or_default().to_lowercase()
}

/// The haystack with `_`, `-` and spaces stripped, for marker tokens.
#[must_use]
pub fn squash(hay: &str) -> String {
    hay.chars().filter(|c| !matches!(c, '_' | '-' | ' ')).collect()
}

/// Distinct PII families present in the haystack.
#[must_use]
pub fn scan_pii(hay: &str) -> Vec<PiiType> {
    let mut found = Vec::new();
    if EMAIL.is_match(hay) {
        found.push(PiiType::Email);
    }
    if EMIRATES_ID.is_match(hay) {
        found.push(PiiType::EmiratesId);
    }
    if UAE_PHONE.is_match(hay) {
        found.push(PiiType::Phone);
    }
    if PASSPORT.is_match(hay) {
        found.push(PiiType::Passport);
    }
    found
}

/// True when any marker occurs in the (pre-squashed) haystack.
#[must_use]
pub fn contains_any(squashed: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| squashed.contains(m))
}

/// True when any object key anywhere in the tree contains one of the
/// needles (keys compared lowercased and squashed).
#[must_use]
pub fn any_key_contains(input: &Value, needles: &[&str]) -> bool {
    match input {
        Value::Object(map) => map.iter().any(|(k, v)| {
            let key = squash(&k.to_lowercase());
            needles.iter().any(|n| key.contains(n)) || any_key_contains(v, needles)
        }),
        Value::Array(items) => items.iter().any(|v| any_key_contains(v, needles)),
        _ => false,
    }
}

/// Value of the first residency-like key found in the tree, lowercased.
#[must_use]
pub fn residency_indicator(input: &Value) -> Option<String> {
    const KEYS: &[&str] = &["dataresidency", "residency", "storageregion", "datalocation", "region"];
    match input {
        Value::Object(map) => {
            for (k, v) in map {
                let key = squash(&k.to_lowercase());
                if KEYS.iter().any(|n| key.contains(n)) {
                    if let Value::String(s) = v {
                        return Some(s.to_lowercase());
                    }
                }
            }
            map.values().find_map(residency_indicator)
        }
        Value::Array(items) => items.iter().find_map(residency_indicator),
        _ => None,
    }
}

/// Credential-like tokens (matched against the squashed haystack).
pub const SECRET_MARKERS: &[&str] =
    &["apikey", "password", "privatekey", "secret", "token=", "beginrsa", "beginprivate"];

/// Special-category data markers.
pub const SENSITIVE_MARKERS: &[&str] = &[
    "health", "medical", "diagnos", "biometric", "genetic", "religio", "ethnic", "criminal",
    "political",
];

/// Explicit separate consent for special-category data.
pub const EXPLICIT_CONSENT_MARKERS: &[&str] =
    &["sensitivedataconsent", "explicitconsent", "separateconsent"];

/// Any consent marker.
pub const CONSENT_MARKERS: &[&str] = &["consent"];

/// Data-subject-rights handling markers.
pub const RIGHTS_MARKERS: &[&str] = &[
    "datasubject", "righttoaccess", "righttoerasure", "rectification", "datarights",
    "subjectrights", "dsrequest",
];

/// Breach-notification / DPO contact markers.
pub const DPO_MARKERS: &[&str] =
    &["dpo", "dataprotectionofficer", "breachnotification", "breachcontact", "breachplan"];

/// Human-oversight markers.
pub const OVERSIGHT_MARKERS: &[&str] = &[
    "humanoversight", "humaninloop", "humanintheloop", "humanreview", "reviewer", "approvedby",
    "escalation",
];

/// Bias-sensitive demographic tokens.
pub const BIAS_MARKERS: &[&str] =
    &["gender", "race", "ethnicity", "religion", "nationality", "disability", "maritalstatus"];

/// Explainability markers.
pub const EXPLANATION_MARKERS: &[&str] = &["explanation", "explainable", "explainability"];

/// Role / authentication markers.
pub const ACCESS_MARKERS: &[&str] =
    &["role", "authorization", "authenticated", "accesslevel", "userid", "username"];

/// Encryption markers.
pub const ENCRYPTION_MARKERS: &[&str] = &["encrypted", "encryption", "ciphertext", "kms", "aes"];

/// Uses prohibited outright by Dubai AI Law Art. 3.
pub const PROHIBITED_USE_MARKERS: &[&str] = &[
    "deepfake",
    "socialscoring",
    "masssurveillance",
    "subliminal",
    "behaviouralmanipulation",
    "behavioralmanipulation",
    "exploitvulnerable",
];

/// High-risk application categories.
pub const HIGH_RISK_MARKERS: &[&str] = &[
    "healthcare",
    "medicaldiagnosis",
    "biometric",
    "creditscoring",
    "lending",
    "hiring",
    "recruitment",
    "lawenforcement",
    "criticalinfrastructure",
    "autonomousvehicle",
];

/// AI registration / conformity markers.
pub const REGISTRATION_MARKERS: &[&str] = &["airegistrationid", "conformityid"];

/// AI-disclosure markers.
pub const DISCLOSURE_MARKERS: &[&str] =
    &["aidisclosure", "aigenerated", "disclosedai", "aitransparency"];

/// Data-governance references.
pub const GOVERNANCE_MARKERS: &[&str] =
    &["datagovernance", "governancepolicy", "datapolicy", "datasteward", "dataquality"];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_email_and_emirates_id() {
        let hay = haystack(&json!({"contact": "Fatima@Example.AE", "eid": "784-1990-1234567-1"}));
        let found = scan_pii(&hay);
        assert!(found.contains(&PiiType::Email));
        assert!(found.contains(&PiiType::EmiratesId));
    }

    #[test]
    fn detects_uae_phone_variants() {
        for phone in ["+971501234567", "00971501234567", "0501234567"] {
            let hay = haystack(&json!({ "phone": phone }));
            assert!(scan_pii(&hay).contains(&PiiType::Phone), "missed {phone}");
        }
        let hay = haystack(&json!({"phone": "+14155550101"}));
        assert!(!scan_pii(&hay).contains(&PiiType::Phone));
    }

    #[test]
    fn detects_passport_shape() {
        let hay = haystack(&json!({"passport": "N1234567"}));
        assert!(scan_pii(&hay).contains(&PiiType::Passport));
    }

    #[test]
    fn squash_bridges_naming_styles() {
        let hay = haystack(&json!({"human_oversight": true, "apiKey": "x"}));
        let squashed = squash(&hay);
        assert!(contains_any(&squashed, OVERSIGHT_MARKERS));
        assert!(contains_any(&squashed, SECRET_MARKERS));
    }

    #[test]
    fn password_policy_version_still_matches() {
        // Known approximation: substring matching is the contract.
        let squashed = squash(&haystack(&json!({"password_policy_version": 3})));
        assert!(contains_any(&squashed, SECRET_MARKERS));
    }

    #[test]
    fn key_scan_is_recursive() {
        let input = json!({"request": {"usePurpose": "kyc"}, "items": [{"actionTaken": "x"}]});
        assert!(any_key_contains(&input, &["purpose"]));
        assert!(any_key_contains(&input, &["action"]));
        assert!(!any_key_contains(&input, &["usecase"]));
    }

    #[test]
    fn residency_value_found() {
        let input = json!({"meta": {"dataResidency": "eu-west-1"}});
        assert_eq!(residency_indicator(&input), Some("eu-west-1".into()));
        assert_eq!(residency_indicator(&json!({"a": 1})), None);
    }
}
