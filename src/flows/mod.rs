//! AI flows: typed request/response pipelines over a generative
//! backend.
//!
//! Every flow follows the same shape: validate the input, short-circuit
//! locally when the backend is not needed, build a prompt with a JSON
//! schema for the expected output, and parse the model's reply into the
//! typed output. Raw model text never reaches callers; a reply that
//! fails to parse is reported as a rejected output and logged at debug.

pub mod backend;
pub mod pinning;
pub mod planner;
pub mod speech;
pub mod structure;
pub mod text;

pub use backend::{GenerativeBackend, HttpBackend};
pub use pinning::pin_note;
pub use planner::{
    materialize_plan, remap_due_dates, GoalPlanFlow, Milestone, PlanInput, PlanOutput,
};
pub use speech::{parse_data_uri, speak, transcribe};
pub use structure::{
    ChecklistFlow, GeneratedTemplate, NoteDraft, NoteFromPromptFlow, SmartPasteFlow, TemplateFlow,
};
pub use text::{
    CompleteFlow, GrammarFlow, LanguageInput, SummarizeFlow, TagsFlow, TextInput, TextOutput,
    TitleFlow, TranslateFlow,
};

use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MemoWeaveError, Result};

/// One generation request as handed to the backend.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Wire identifier of the flow, for logging and error context.
    pub flow: &'static str,
    pub system: String,
    pub prompt: String,
    /// JSON schema the reply must satisfy, when the flow has a
    /// structured output.
    pub schema: Option<serde_json::Value>,
}

/// A typed flow: input in, validated output out.
#[async_trait]
pub trait Flow: Send + Sync {
    type Input: Serialize + Send + Sync;
    type Output: DeserializeOwned + JsonSchema + Send;

    /// Wire/CLI identifier.
    fn name(&self) -> &'static str;

    fn validate(&self, _input: &Self::Input) -> Result<()> {
        Ok(())
    }

    /// Local answer that skips the backend entirely.
    fn short_circuit(&self, _input: &Self::Input) -> Option<Self::Output> {
        None
    }

    fn system(&self) -> String;

    fn prompt(&self, input: &Self::Input) -> String;

    /// Post-parse cleanup and output validation.
    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        Ok(output)
    }

    async fn run(
        &self,
        backend: &dyn GenerativeBackend,
        input: Self::Input,
    ) -> Result<Self::Output> {
        self.validate(&input)?;
        if let Some(output) = self.short_circuit(&input) {
            return Ok(output);
        }

        let request = GenerateRequest {
            flow: self.name(),
            system: self.system(),
            prompt: self.prompt(&input),
            schema: Some(output_schema::<Self::Output>()?),
        };
        let raw = backend.generate(request).await?;
        let output = parse_output(self.name(), &raw)?;
        self.finish(output)
    }
}

fn output_schema<T: JsonSchema>() -> Result<serde_json::Value> {
    let schema = schemars::SchemaGenerator::default().into_root_schema_for::<T>();
    Ok(serde_json::to_value(schema)?)
}

/// Parse a model reply into the flow's output type. Code fences are
/// tolerated; anything else unparseable rejects the output.
pub(crate) fn parse_output<T: DeserializeOwned>(flow: &'static str, raw: &str) -> Result<T> {
    match serde_json::from_str(strip_fences(raw)) {
        Ok(output) => Ok(output),
        Err(err) => {
            tracing::debug!(flow, %err, raw, "model reply failed to parse");
            Err(MemoWeaveError::FlowOutputRejected { flow })
        }
    }
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

fn retryable(err: &MemoWeaveError) -> bool {
    matches!(
        err,
        MemoWeaveError::Backend { .. }
            | MemoWeaveError::Http(_)
            | MemoWeaveError::FlowFailed { .. }
    )
}

/// Run a flow, retrying backend failures with doubling backoff. Input
/// validation errors and rejected outputs are returned immediately.
pub async fn run_with_retry<F>(
    flow: &F,
    backend: &dyn GenerativeBackend,
    input: F::Input,
    attempts: u32,
    base_delay: Duration,
) -> Result<F::Output>
where
    F: Flow,
    F::Input: Clone,
{
    let attempts = attempts.max(1);
    let mut delay = base_delay;
    let mut attempt = 1;
    loop {
        match flow.run(backend, input.clone()).await {
            Ok(output) => return Ok(output),
            Err(err) if attempt < attempts && retryable(&err) => {
                tracing::warn!(
                    flow = flow.name(),
                    attempt,
                    %err,
                    "flow attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
