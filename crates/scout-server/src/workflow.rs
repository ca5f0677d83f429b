// ABOUTME: Workflow orchestrator: guardrail gate, criteria resolution, agent loop, and output shaping.
// ABOUTME: Produces the `{output_text, output_parsed}` pair the HTTP layer returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use ulid::Ulid;

use scout_agent::{AgentLoop, GuardrailOutcome, GuardrailReport, Source, any_tripped};
use scout_core::{ListingCriteria, NormalizedListing};

use crate::app_state::AppState;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("input_as_text is required")]
    EmptyInput,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("request body is too large")]
    BodyTooLarge,

    #[error("failed to serialize workflow output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("workflow task aborted: {0}")]
    Aborted(String),
}

/// Body of `POST /runWorkflow`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowInput {
    #[serde(default)]
    pub input_as_text: Option<String>,
    /// Free-form criteria; anything other than a JSON object is ignored.
    #[serde(default)]
    pub input_variables: Option<Value>,
}

impl WorkflowInput {
    pub fn new(text: impl Into<String>, variables: Value) -> Self {
        Self {
            input_as_text: Some(text.into()),
            input_variables: Some(variables),
        }
    }

    /// The trimmed request text, or `None` when missing or blank.
    pub fn text(&self) -> Option<&str> {
        self.input_as_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    fn variables(&self) -> Map<String, Value> {
        match &self.input_variables {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutput {
    pub output_text: String,
    pub output_parsed: Value,
}

impl WorkflowOutput {
    fn from_parsed(parsed: &impl Serialize) -> Result<Self, WorkflowError> {
        let output_parsed = serde_json::to_value(parsed)?;
        Ok(Self {
            output_text: serde_json::to_string(&output_parsed)?,
            output_parsed,
        })
    }
}

/// `output_parsed` for a normal run.
#[derive(Debug, Serialize)]
struct ListingResults {
    listings: Vec<NormalizedListing>,
    sources: Vec<Source>,
    notes_en: String,
    notes_fr: String,
    warnings: Vec<String>,
    criteria: ListingCriteria,
    run_id: String,
}

/// `output_parsed` when a guardrail tripwire fired.
#[derive(Debug, Serialize)]
struct GuardrailFailure {
    #[serde(flatten)]
    report: GuardrailReport,
    run_id: String,
}

/// Warnings for checks that errored without tripping; the run continues.
fn guardrail_warnings(outcomes: &[GuardrailOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| o.execution_failed)
        .filter_map(|o| o.info.as_ref())
        .map(|info| {
            format!(
                "Guardrail \"{}\" could not run: {}",
                info.guardrail_name,
                info.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect()
}

/// Run one workflow: guardrails first, then the agent loop if nothing tripped.
pub async fn run_workflow(
    state: &AppState,
    input: WorkflowInput,
) -> Result<WorkflowOutput, WorkflowError> {
    let text = input.text().ok_or(WorkflowError::EmptyInput)?;
    let run_id = Ulid::new().to_string();

    let criteria = ListingCriteria::from_variables(&input.variables(), &state.config.default_location);
    tracing::info!(run_id = %run_id, location = %criteria.location, "workflow started");

    let outcomes = state.guardrail.check(text).await;
    if any_tripped(&outcomes) {
        let report = GuardrailReport::from_outcomes(&outcomes);
        tracing::warn!(
            run_id = %run_id,
            pii = report.pii.failed,
            moderation = report.moderation.failed,
            "guardrail tripped, skipping agent"
        );
        return WorkflowOutput::from_parsed(&GuardrailFailure { report, run_id });
    }

    let agent = AgentLoop::new(state.model.clone(), state.tools.clone());
    let outcome = agent.run(&criteria, text).await;

    let mut warnings = guardrail_warnings(&outcomes);
    warnings.extend(outcome.warnings);

    tracing::info!(
        run_id = %run_id,
        status = ?outcome.status,
        turns = outcome.turns,
        listings = outcome.listings.len(),
        warnings = warnings.len(),
        "workflow finished"
    );

    WorkflowOutput::from_parsed(&ListingResults {
        listings: outcome.listings,
        sources: outcome.sources,
        notes_en: outcome.notes_en,
        notes_fr: outcome.notes_fr,
        warnings,
        criteria,
        run_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use scout_agent::testing::{ScriptedChatModel, StaticGuardrail};
    use scout_agent::{ChatModel, Guardrail, GuardrailInfo, NoopGuardrail, ToolRegistry};
    use serde_json::json;

    use crate::config::ScoutConfig;

    fn state(model: Arc<ScriptedChatModel>, guardrail: Arc<dyn Guardrail>) -> AppState {
        AppState::new(
            ScoutConfig::default(),
            model as Arc<dyn ChatModel>,
            guardrail,
            Arc::new(ToolRegistry::new()),
        )
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let model = Arc::new(ScriptedChatModel::answering("{}"));
        let state = state(model.clone(), Arc::new(NoopGuardrail));

        let err = run_workflow(&state, WorkflowInput::new("   ", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyInput));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn normal_run_has_full_output_schema() {
        let model = Arc::new(ScriptedChatModel::answering(
            r#"{"listings": [], "sources": [], "notes_en": "none", "notes_fr": "aucun"}"#,
        ));
        let state = state(model, Arc::new(NoopGuardrail));

        let output = run_workflow(&state, WorkflowInput::new("condo", json!({ "beds": 2 })))
            .await
            .unwrap();
        let parsed = &output.output_parsed;

        for key in ["listings", "sources", "notes_en", "notes_fr", "warnings", "criteria", "run_id"] {
            assert!(parsed.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(parsed["criteria"]["location"], "Montréal, QC");
        assert_eq!(parsed["criteria"]["beds"], "2");
        assert_eq!(parsed["notes_fr"], "aucun");
        assert_eq!(parsed["run_id"].as_str().map(str::len), Some(26));

        let reparsed: Value = serde_json::from_str(&output.output_text).unwrap();
        assert_eq!(&reparsed, parsed);
    }

    #[tokio::test]
    async fn non_object_variables_are_ignored() {
        let model = Arc::new(ScriptedChatModel::answering("{}"));
        let state = state(model, Arc::new(NoopGuardrail));

        let output = run_workflow(&state, WorkflowInput::new("condo", json!(["x"])))
            .await
            .unwrap();
        assert_eq!(output.output_parsed["criteria"]["location"], "Montréal, QC");
    }

    #[tokio::test]
    async fn errored_guardrail_becomes_a_warning() {
        let model = Arc::new(ScriptedChatModel::answering("{}"));
        let guardrail = StaticGuardrail::new(vec![GuardrailOutcome::errored(
            "Moderation",
            "OPENAI_API_KEY is not set",
        )]);
        let state = state(model.clone(), Arc::new(guardrail));

        let output = run_workflow(&state, WorkflowInput::new("condo", json!({})))
            .await
            .unwrap();
        let warnings = output.output_parsed["warnings"].as_array().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].as_str().unwrap().contains("Moderation"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn tripped_pii_check_short_circuits() {
        let model = Arc::new(ScriptedChatModel::answering("{}"));
        let guardrail = StaticGuardrail::new(vec![GuardrailOutcome::tripped(GuardrailInfo {
            detected_entities: [("EMAIL_ADDRESS".to_string(), 1)].into_iter().collect(),
            ..GuardrailInfo::named("Contains PII")
        })]);
        let state = state(model.clone(), Arc::new(guardrail));

        let output = run_workflow(&state, WorkflowInput::new("mail me at a@b.ca", json!({})))
            .await
            .unwrap();
        let parsed = &output.output_parsed;

        assert_eq!(parsed["guardrail_failed"], true);
        assert_eq!(parsed["pii"]["failed"], true);
        assert_eq!(parsed["pii"]["detected_counts"]["EMAIL_ADDRESS"], 1);
        assert_eq!(parsed["moderation"]["failed"], false);
        assert!(parsed["run_id"].is_string());
        assert!(parsed.get("listings").is_none());
        assert_eq!(model.calls(), 0);
    }
}
