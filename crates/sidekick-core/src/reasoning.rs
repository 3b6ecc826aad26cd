//! Splits raw assistant text into its visible answer and embedded blocks.
//!
//! Assistant content may carry, in any combination:
//!
//! ```text
//! <think>private reasoning</think>
//! <plan>{"goal": "...", "steps": ["...", {"description": "...", "tool": "..."}]}</plan>
//! <final_answer>the answer</final_answer>
//! free text shown to the user
//! ```
//!
//! The structured parser only accepts a reasoning block that *leads* the
//! response. A second regex pass picks up the first `<think>` pair anywhere in
//! the text whenever the structured pass found none, so a reasoning toggle is
//! always derivable when the delimiters are present.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const PLAN_OPEN: &str = "<plan>";
const PLAN_CLOSE: &str = "</plan>";
const FINAL_OPEN: &str = "<final_answer>";
const FINAL_CLOSE: &str = "</final_answer>";

static THINK_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("reasoning pattern is valid"));

/// One step of an execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

/// Structured execution plan embedded in an assistant response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    pub steps: Vec<PlanStep>,
}

/// Where a reasoning block was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningSource {
    /// Leading block recognised by the structured parser.
    Structured,
    /// First delimiter pair found by the regex fallback.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningBlock {
    pub text: String,
    /// Rough token count, `ceil(chars / 4)`.
    pub token_estimate: usize,
    pub source: ReasoningSource,
}

impl ReasoningBlock {
    fn new(text: &str, source: ReasoningSource) -> Self {
        let text = text.trim().to_string();
        Self {
            token_estimate: estimate_tokens(&text),
            text,
            source,
        }
    }
}

/// Result of [`extract`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedResponse {
    pub visible: String,
    pub plan: Option<ExecutionPlan>,
    pub final_answer: Option<String>,
    pub reasoning: Option<ReasoningBlock>,
}

/// Approximates a token count as one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Parses a raw assistant response.
pub fn extract(raw: &str) -> ExtractedResponse {
    let mut parsed = parse_structured(raw);

    if parsed.reasoning.is_none()
        && let Some(caps) = THINK_PAIR.captures(raw)
    {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        parsed.reasoning = Some(ReasoningBlock::new(inner, ReasoningSource::Fallback));
        parsed.visible = THINK_PAIR.replace(&parsed.visible, "").trim().to_string();
        tracing::trace!(
            "[ReasoningExtractor] Fallback extraction: {} tokens",
            parsed.reasoning.as_ref().map_or(0, |r| r.token_estimate)
        );
    }

    parsed
}

fn parse_structured(raw: &str) -> ExtractedResponse {
    let mut out = ExtractedResponse::default();
    let mut rest = raw.trim_start().to_string();

    if let Some(after_open) = rest.strip_prefix(THINK_OPEN)
        && let Some(end) = after_open.find(THINK_CLOSE)
    {
        out.reasoning = Some(ReasoningBlock::new(
            &after_open[..end],
            ReasoningSource::Structured,
        ));
        rest = after_open[end + THINK_CLOSE.len()..].to_string();
    }

    if let Some((inner, remaining)) = take_block(&rest, PLAN_OPEN, PLAN_CLOSE) {
        match parse_plan(&inner) {
            Some(plan) => {
                out.plan = Some(plan);
                rest = remaining;
            }
            None => {
                tracing::debug!("[ReasoningExtractor] Ignoring malformed plan block");
            }
        }
    }

    if let Some((inner, remaining)) = take_block(&rest, FINAL_OPEN, FINAL_CLOSE) {
        out.final_answer = Some(inner.trim().to_string());
        rest = remaining;
    }

    out.visible = rest.trim().to_string();
    if out.visible.is_empty()
        && let Some(answer) = &out.final_answer
    {
        out.visible = answer.clone();
    }
    out
}

/// Cuts the first `open..close` block out of `text`.
///
/// Returns the block body and the text with the block removed.
fn take_block(text: &str, open: &str, close: &str) -> Option<(String, String)> {
    let start = text.find(open)?;
    let body_start = start + open.len();
    let body_len = text[body_start..].find(close)?;
    let body = text[body_start..body_start + body_len].to_string();

    let mut remaining = String::with_capacity(text.len());
    remaining.push_str(&text[..start]);
    remaining.push_str(&text[body_start + body_len + close.len()..]);
    Some((body, remaining))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStep {
    Text(String),
    Detailed {
        description: String,
        #[serde(default)]
        tool: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlan {
    Object {
        #[serde(default)]
        goal: Option<String>,
        steps: Vec<RawStep>,
    },
    Steps(Vec<RawStep>),
}

fn parse_plan(body: &str) -> Option<ExecutionPlan> {
    let raw: RawPlan = serde_json::from_str(body.trim()).ok()?;
    let (goal, steps) = match raw {
        RawPlan::Object { goal, steps } => (goal, steps),
        RawPlan::Steps(steps) => (None, steps),
    };
    let steps = steps
        .into_iter()
        .map(|step| match step {
            RawStep::Text(description) => PlanStep {
                description,
                tool: None,
            },
            RawStep::Detailed { description, tool } => PlanStep { description, tool },
        })
        .collect();
    Some(ExecutionPlan { goal, steps })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let out = extract("  Balance is 12 SOL. ");
        assert_eq!(out.visible, "Balance is 12 SOL.");
        assert!(out.plan.is_none());
        assert!(out.final_answer.is_none());
        assert!(out.reasoning.is_none());
    }

    #[test]
    fn test_leading_reasoning_is_structured() {
        let out = extract("<think>check the ledger</think>\nThe wallet is active.");
        let reasoning = out.reasoning.unwrap();
        assert_eq!(reasoning.text, "check the ledger");
        assert_eq!(reasoning.source, ReasoningSource::Structured);
        assert_eq!(reasoning.token_estimate, 4);
        assert_eq!(out.visible, "The wallet is active.");
    }

    #[test]
    fn test_embedded_reasoning_uses_fallback() {
        let out = extract("Intro line.\n<think>abcdefghi</think>\nAnswer.");
        let reasoning = out.reasoning.unwrap();
        assert_eq!(reasoning.source, ReasoningSource::Fallback);
        assert_eq!(reasoning.text, "abcdefghi");
        // ceil(9 / 4)
        assert_eq!(reasoning.token_estimate, 3);
        assert!(!out.visible.contains("<think>"));
        assert!(out.visible.contains("Answer."));
    }

    #[test]
    fn test_fallback_takes_first_pair_only() {
        let out = extract("x <think>one</think> y <think>two</think>");
        assert_eq!(out.reasoning.unwrap().text, "one");
        assert!(out.visible.contains("<think>two</think>"));
    }

    #[test]
    fn test_plan_and_final_answer() {
        let raw = r#"<think>r</think><plan>{"goal":"trace","steps":["fetch",{"description":"graph","tool":"trace_flow"}]}</plan><final_answer>Done tracing.</final_answer>"#;
        let out = extract(raw);

        let plan = out.plan.unwrap();
        assert_eq!(plan.goal.as_deref(), Some("trace"));
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[1].tool.as_deref(), Some("trace_flow"));
        assert_eq!(out.final_answer.as_deref(), Some("Done tracing."));
        assert_eq!(out.visible, "Done tracing.");
    }

    #[test]
    fn test_malformed_plan_stays_visible() {
        let out = extract("<plan>{not json</plan> text");
        assert!(out.plan.is_none());
        assert!(out.visible.starts_with("<plan>"));
    }

    #[test]
    fn test_unterminated_delimiter_is_ignored() {
        let out = extract("<think>never closed");
        assert!(out.reasoning.is_none());
        assert_eq!(out.visible, "<think>never closed");
    }

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
