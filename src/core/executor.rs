//! Executor: the single LLM call per decision
//!
//! Interpretation only. The model receives status labels, never raw
//! thresholds, and its response is treated as untyped JSON: every field is
//! defaulted at this boundary. Any failure is fail-closed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::hashing::prefixed_json_hash;
use crate::core::provider::{CompletionProvider, CompletionRequest, ProviderError};
use crate::types::{
    AdsInput, AdsOutput, AuthorityScore, Confidence, NormalizedMetrics, RiskFlag, SignalBreakdown,
};
use crate::{EXECUTOR_TEMPERATURE, EXECUTOR_TIMEOUT_SECS};

/// Output contract given to the model
pub const SYSTEM_CONTRACT: &str = "You are a voice authority analyst. You receive per-metric \
status labels (already computed against calibrated thresholds), the transcript, and the \
speaker context. Interpret them; do not invent numeric thresholds. Respond with exactly one \
JSON object and nothing else, with these fields: \
confidence (\"low\"|\"medium\"|\"high\"), authority_score (\"LOW\"|\"MEDIUM\"|\"HIGH\"), \
signal_breakdown {strengths: [string], weaknesses: [string]}, \
risk_flags (subset of [\"UPWARD_INFLECTION\",\"MONOTONE\",\"RUSHING\",\"LOW_ENERGY\"]), \
recommended_protocol [string], hitl_required (boolean).";

/// Transcript characters forwarded to the model
const MAX_TRANSCRIPT_CHARS: usize = 4000;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("executor timed out after {0:?}")]
    Timeout(Duration),
    #[error("provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// A successful interpretation
#[derive(Debug, Clone)]
pub struct ExecutorRun {
    /// Output with every optional field defaulted
    pub output: AdsOutput,
    /// `sha256:<hex>` of the serialized output
    pub output_hash: String,
    /// Score and confidence were stated explicitly, not defaulted
    pub interpretable: bool,
}

/// Executor wrapping one completion provider
#[derive(Clone)]
pub struct Executor {
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
    temperature: f64,
    max_tokens: u32,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Executor {
    /// Executor with the default 10 s timeout and temperature 0.0
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(EXECUTOR_TIMEOUT_SECS),
            temperature: EXECUTOR_TEMPERATURE,
            max_tokens: 600,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the interpretation call. Dropping the future on timeout cancels it.
    pub async fn interpret(
        &self,
        input: &AdsInput,
        normalized: &NormalizedMetrics,
    ) -> Result<ExecutorRun, ExecutorError> {
        let request = CompletionRequest {
            system_prompt: SYSTEM_CONTRACT.to_string(),
            user_prompt: build_user_prompt(input, normalized),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let raw = match tokio::time::timeout(self.timeout, self.provider.complete(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(sample = %input.audio_sample_id, timeout = ?self.timeout, "executor timed out");
                return Err(ExecutorError::Timeout(self.timeout));
            }
        };

        let (output, interpretable) = parse_executor_response(&raw)?;
        let output_hash = prefixed_json_hash(&output)
            .map_err(|e| ExecutorError::MalformedResponse(e.to_string()))?;
        debug!(sample = %input.audio_sample_id, hash = %output_hash, interpretable, "executor verdict");

        Ok(ExecutorRun { output, output_hash, interpretable })
    }
}

/// User prompt: labels + transcript + context, as JSON
pub fn build_user_prompt(input: &AdsInput, normalized: &NormalizedMetrics) -> String {
    let transcript: String = input.transcript.chars().take(MAX_TRANSCRIPT_CHARS).collect();
    json!({
        "metric_status": normalized,
        "duration_seconds": input.duration_seconds,
        "word_count": input.word_count(),
        "transcript": transcript,
        "user_context": input.user_context,
    })
    .to_string()
}

/// Parse a raw completion into a fully-defaulted output.
///
/// Accepts surrounding prose or code fences; takes the outermost `{...}`.
/// Returns the output and whether score + confidence were explicit.
pub fn parse_executor_response(raw: &str) -> Result<(AdsOutput, bool), ExecutorError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let body = match (start, end) {
        (Some(s), Some(e)) if e > s => &raw[s..=e],
        _ => return Err(ExecutorError::MalformedResponse("no JSON object".into())),
    };

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExecutorError::MalformedResponse(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ExecutorError::MalformedResponse("not an object".into()))?;

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(Confidence::parse_lenient);
    let authority_score = obj
        .get("authority_score")
        .and_then(Value::as_str)
        .and_then(AuthorityScore::parse_lenient);
    let interpretable = confidence.is_some() && authority_score.is_some();

    let breakdown = obj.get("signal_breakdown");
    let signal_breakdown = SignalBreakdown {
        strengths: string_array(breakdown.and_then(|b| b.get("strengths"))),
        weaknesses: string_array(breakdown.and_then(|b| b.get("weaknesses"))),
    };

    let risk_flags: Vec<RiskFlag> = obj
        .get("risk_flags")
        .and_then(Value::as_array)
        .map(|flags| {
            flags
                .iter()
                .filter_map(Value::as_str)
                .filter_map(RiskFlag::parse_lenient)
                .collect()
        })
        .unwrap_or_default();

    let output = AdsOutput {
        decision_allowed: true,
        confidence: Some(confidence.unwrap_or(Confidence::Medium)),
        authority_score: Some(authority_score.unwrap_or(AuthorityScore::Low)),
        signal_breakdown: Some(signal_breakdown),
        risk_flags: Some(risk_flags),
        recommended_protocol: Some(string_array(obj.get("recommended_protocol"))),
        hitl_required: Some(obj.get("hitl_required").and_then(Value::as_bool).unwrap_or(false)),
        reason: None,
        next_action: None,
    };

    Ok((output, interpretable))
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// TESTS
// =============================================================================
