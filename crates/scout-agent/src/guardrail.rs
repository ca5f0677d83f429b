// ABOUTME: Guardrail gate contract: checks over the raw user input that can trip a workflow short-circuit.
// ABOUTME: Provides a no-op check, a local PII detector, a remote moderation check, and a report builder.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::providers::openai::api_root;

pub const MODERATION_NAME: &str = "Moderation";
pub const PII_NAME: &str = "Contains PII";
pub const JAILBREAK_NAME: &str = "Jailbreak";
pub const HALLUCINATION_NAME: &str = "Hallucination Detection";

/// Moderation categories that trip the gate by default.
pub const DEFAULT_MODERATION_CATEGORIES: &[&str] = &[
    "sexual/minors",
    "hate/threatening",
    "harassment/threatening",
    "self-harm/instructions",
    "violence/graphic",
    "illicit/violent",
];

/// Diagnostic detail attached to a guardrail result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardrailInfo {
    pub guardrail_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detected_entities: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GuardrailInfo {
    pub fn named(name: &str) -> Self {
        Self {
            guardrail_name: name.to_string(),
            ..Default::default()
        }
    }
}

/// The result of one guardrail check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailOutcome {
    pub tripwire_triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<GuardrailInfo>,
    /// The check errored rather than running to completion.
    #[serde(default)]
    pub execution_failed: bool,
}

impl GuardrailOutcome {
    pub fn passed(info: GuardrailInfo) -> Self {
        Self {
            tripwire_triggered: false,
            info: Some(info),
            execution_failed: false,
        }
    }

    pub fn tripped(info: GuardrailInfo) -> Self {
        Self {
            tripwire_triggered: true,
            info: Some(info),
            execution_failed: false,
        }
    }

    pub fn errored(name: &str, error: impl Into<String>) -> Self {
        Self {
            tripwire_triggered: false,
            info: Some(GuardrailInfo {
                error: Some(error.into()),
                ..GuardrailInfo::named(name)
            }),
            execution_failed: true,
        }
    }

    fn name(&self) -> &str {
        self.info.as_ref().map(|i| i.guardrail_name.as_str()).unwrap_or_default()
    }
}

/// A moderation/PII check over the user's input text.
#[async_trait]
pub trait Guardrail: Send + Sync {
    async fn check(&self, input: &str) -> Vec<GuardrailOutcome>;
}

/// Whether any outcome demands a short-circuit.
pub fn any_tripped(outcomes: &[GuardrailOutcome]) -> bool {
    outcomes.iter().any(|o| o.tripwire_triggered)
}

/// Never trips. Default when no checks are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGuardrail;

#[async_trait]
impl Guardrail for NoopGuardrail {
    async fn check(&self, _input: &str) -> Vec<GuardrailOutcome> {
        Vec::new()
    }
}

/// Runs several guardrails concurrently and concatenates their outcomes in order.
#[derive(Clone, Default)]
pub struct GuardrailChain {
    checks: Vec<Arc<dyn Guardrail>>,
}

impl GuardrailChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, check: impl Guardrail + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[async_trait]
impl Guardrail for GuardrailChain {
    async fn check(&self, input: &str) -> Vec<GuardrailOutcome> {
        futures::future::join_all(self.checks.iter().map(|c| c.check(input)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

/// PII entity types the local detector knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiiEntity {
    EmailAddress,
    PhoneNumber,
    CreditCard,
    CaSocialInsuranceNumber,
}

impl PiiEntity {
    pub const ALL: [PiiEntity; 4] = [
        PiiEntity::EmailAddress,
        PiiEntity::PhoneNumber,
        PiiEntity::CreditCard,
        PiiEntity::CaSocialInsuranceNumber,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PiiEntity::EmailAddress => "EMAIL_ADDRESS",
            PiiEntity::PhoneNumber => "PHONE_NUMBER",
            PiiEntity::CreditCard => "CREDIT_CARD",
            PiiEntity::CaSocialInsuranceNumber => "CA_SIN",
        }
    }
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern")
});
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[\s.-]?)?\(?\b\d{3}\)?[\s.-]?\d{3}[\s.-]\d{4}\b").expect("phone pattern")
});
static CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d(?:[ -]?\d){12,18}\b").expect("card pattern"));
static SIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}[ -]\d{3}[ -]\d{3}\b").expect("sin pattern"));

/// Luhn checksum, used to keep long prices and listing numbers from reading as cards.
fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Local regex-based PII detector. Trips when any blocked entity type is found.
#[derive(Debug, Clone)]
pub struct PiiGuardrail {
    blocked: Vec<PiiEntity>,
}

impl Default for PiiGuardrail {
    fn default() -> Self {
        Self {
            blocked: PiiEntity::ALL.to_vec(),
        }
    }
}

impl PiiGuardrail {
    pub fn blocking(blocked: Vec<PiiEntity>) -> Self {
        Self { blocked }
    }

    /// Count occurrences of each blocked entity type in `input`.
    pub fn detect(&self, input: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entity in &self.blocked {
            let count = match entity {
                PiiEntity::EmailAddress => EMAIL.find_iter(input).count(),
                PiiEntity::PhoneNumber => PHONE.find_iter(input).count(),
                PiiEntity::CreditCard => CARD
                    .find_iter(input)
                    .filter(|m| luhn_valid(m.as_str()))
                    .count(),
                PiiEntity::CaSocialInsuranceNumber => SIN.find_iter(input).count(),
            };
            if count > 0 {
                counts.insert(entity.label().to_string(), count);
            }
        }
        counts
    }
}

#[async_trait]
impl Guardrail for PiiGuardrail {
    async fn check(&self, input: &str) -> Vec<GuardrailOutcome> {
        let detected = self.detect(input);
        let info = GuardrailInfo {
            detected_entities: detected.clone(),
            ..GuardrailInfo::named(PII_NAME)
        };
        if detected.is_empty() {
            vec![GuardrailOutcome::passed(info)]
        } else {
            tracing::info!(entities = ?detected.keys().collect::<Vec<_>>(), "PII detected in input");
            vec![GuardrailOutcome::tripped(info)]
        }
    }
}

/// Why a guardrail check could not complete.
#[derive(Debug, thiserror::Error)]
pub enum GuardrailError {
    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error("moderation request failed: {0}")]
    Transport(String),

    #[error("moderation API error {0}")]
    Status(u16),

    #[error("invalid moderation response: {0}")]
    InvalidResponse(String),
}

/// Remote moderation via an OpenAI-compatible `/v1/moderations` endpoint.
/// Transport failures yield an `execution_failed` outcome that does not trip.
pub struct ModerationGuardrail {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    categories: Vec<String>,
}

impl ModerationGuardrail {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: api_root(&base_url),
            categories: DEFAULT_MODERATION_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Flagged categories from a moderation response, limited to the configured set.
    pub fn flagged_categories(&self, response_body: &Value) -> Vec<String> {
        let Some(categories) = response_body
            .pointer("/results/0/categories")
            .and_then(|c| c.as_object())
        else {
            return Vec::new();
        };
        categories
            .iter()
            .filter(|(_, flagged)| flagged.as_bool() == Some(true))
            .map(|(name, _)| name.clone())
            .filter(|name| self.categories.is_empty() || self.categories.contains(name))
            .collect()
    }

    async fn moderate(&self, input: &str) -> Result<Vec<String>, GuardrailError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GuardrailError::MissingCredential("OPENAI_API_KEY"))?;
        let response = self
            .client
            .post(format!("{}/v1/moderations", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({ "model": "omni-moderation-latest", "input": input }))
            .send()
            .await
            .map_err(|e| GuardrailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GuardrailError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GuardrailError::InvalidResponse(e.to_string()))?;
        Ok(self.flagged_categories(&body))
    }
}

#[async_trait]
impl Guardrail for ModerationGuardrail {
    async fn check(&self, input: &str) -> Vec<GuardrailOutcome> {
        match self.moderate(input).await {
            Ok(flagged) if flagged.is_empty() => {
                vec![GuardrailOutcome::passed(GuardrailInfo::named(MODERATION_NAME))]
            }
            Ok(flagged) => {
                tracing::info!(categories = ?flagged, "moderation flagged input");
                vec![GuardrailOutcome::tripped(GuardrailInfo {
                    flagged_categories: flagged,
                    ..GuardrailInfo::named(MODERATION_NAME)
                })]
            }
            Err(e) => {
                tracing::warn!(error = %e, "moderation check failed");
                vec![GuardrailOutcome::errored(MODERATION_NAME, e.to_string())]
            }
        }
    }
}

/// Status of one kind of check in the failure report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckStatus {
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged_categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_counts: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Structured summary returned instead of running the agent when a tripwire fires.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardrailReport {
    pub guardrail_failed: bool,
    pub pii: CheckStatus,
    pub moderation: CheckStatus,
    pub jailbreak: CheckStatus,
    pub hallucination: CheckStatus,
    /// At least one check errored instead of completing.
    pub execution_failed: bool,
}

impl GuardrailReport {
    pub fn from_outcomes(outcomes: &[GuardrailOutcome]) -> Self {
        let mut report = Self {
            guardrail_failed: any_tripped(outcomes),
            pii: CheckStatus::default(),
            moderation: CheckStatus::default(),
            jailbreak: CheckStatus::default(),
            hallucination: CheckStatus::default(),
            execution_failed: outcomes.iter().any(|o| o.execution_failed),
        };

        for outcome in outcomes.iter().filter(|o| o.tripwire_triggered) {
            let info = outcome.info.clone().unwrap_or_default();
            let name = outcome.name().to_ascii_lowercase();

            if name.contains("pii") {
                report.pii.failed = true;
                report.pii.detected_counts = Some(info.detected_entities);
            } else if name.contains("moderation") {
                report.moderation.failed = true;
                report.moderation.flagged_categories = Some(info.flagged_categories);
            } else if name.contains("jailbreak") {
                report.jailbreak.failed = true;
                report.jailbreak.reasoning = info.reasoning;
            } else if name.contains("hallucination") {
                report.hallucination.failed = true;
                report.hallucination.reasoning = info.reasoning;
            }
        }

        report
    }
}
