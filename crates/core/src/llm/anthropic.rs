use crate::config::Settings;
use crate::domain::contract::{LlmNarrative, Narrative};
use crate::domain::AgentKind;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json;
use crate::llm::{BriefNarrator, NarrativeInput, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const REPAIR_ATTEMPTS: u32 = 2;

const TOOL_NAME_EMIT_NARRATIVE: &str = "emit_narrative";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> anyhow::Result<(serde_json::Value, CreateMessageResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse Anthropic response JSON: {text}"))?;
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone())
            .context("failed to decode Anthropic response into CreateMessageResponse")?;
        Ok((raw_json, parsed))
    }

    fn request(&self, content: String) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(Self::system_prompt()),
            messages: vec![Message {
                role: "user",
                content,
            }],
            tools: Some(Self::tools()),
            tool_choice: Some(Self::tool_choice()),
        }
    }

    fn tools() -> Vec<Tool> {
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["debate", "chiefSummary"],
            "properties": {
                "debate": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": 8,
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["agentId", "text", "timestamp"],
                        "properties": {
                            "agentId": {"type": "string", "enum": agent_ids()},
                            "text": {"type": "string"},
                            "timestamp": {"type": "string"}
                        }
                    }
                },
                "chiefSummary": {"type": "string"}
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_NARRATIVE,
            description: "Emit the council debate and chief strategist summary as structured JSON",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_NARRATIVE,
        }
    }

    fn system_prompt() -> String {
        let roster = AgentKind::ALL
            .iter()
            .map(|a| format!("- {} ({}): {}", a.display_name(), a.id(), a.description()))
            .collect::<Vec<_>>()
            .join("\n");
        let speaker_rule = format!("- agentId must be one of {}", agent_ids().join(", "));

        [
            "You are the Chief Strategist of an Investment Council of three analysts:",
            roster.as_str(),
            "Return ONLY valid JSON. Do not wrap in markdown. Do not include any extra keys.",
            "Output schema:",
            "{",
            "  \"debate\": [ { \"agentId\": \"momentum_v1\", \"text\": \"...\", \"timestamp\": \"HH:MM\" } ],",
            "  \"chiefSummary\": \"...\"",
            "}",
            "Rules:",
            "- debate must have exactly 4 short chat-style messages",
            speaker_rule.as_str(),
            "- agents must cite the provided PE, ROE and return metrics",
            "- chiefSummary must be exactly 2 sentences",
        ]
        .join("\n")
    }

    fn user_prompt(input: &NarrativeInput) -> String {
        format!(
            "Horizon: {horizon}\n\nCandidates for BUY:\n{metrics}\n\nSELL/AVOID List:\n{actions}\n\n\
Task: Debate these picks for a {horizon} horizon, challenging or supporting each with the metrics above, \
then conclude the outlook.",
            horizon = input.horizon,
            metrics = input.metrics_lines(),
            actions = input.actions_line(),
        )
    }

    fn repair_prompt(previous_output: &str) -> String {
        format!(
            "Your previous message was NOT valid JSON for the required schema.\n\n\
TASK: Output ONLY a single JSON object with keys \"debate\" and \"chiefSummary\".\n\
- Do NOT include any markdown, prose, or code fences.\n\
- Each debate entry MUST include agentId, text and timestamp.\n\
- agentId MUST be one of {ids}.\n\n\
INVALID OUTPUT (for reference only; DO NOT copy verbatim):\n{previous_output}",
            ids = agent_ids().join(", "),
        )
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_narrative(res: &CreateMessageResponse) -> anyhow::Result<Option<LlmNarrative>> {
        for block in &res.content {
            if let ContentBlock::ToolUse { name, input, .. } = block {
                if name == TOOL_NAME_EMIT_NARRATIVE {
                    let parsed = serde_json::from_value::<LlmNarrative>(input.clone())
                        .context("failed to decode tool_use.input into LlmNarrative")?;
                    return Ok(Some(parsed));
                }
            }
        }
        Ok(None)
    }

    async fn try_parse_with_repairs(
        &self,
        input: &NarrativeInput,
        initial_text: String,
        initial_raw_json: serde_json::Value,
    ) -> anyhow::Result<Narrative> {
        let mut last_err = match json::parse_narrative(&initial_text) {
            Ok(narrative) => return Ok(narrative),
            Err(err) => err,
        };
        let mut last_text = initial_text;
        let mut last_raw_json = initial_raw_json;

        for attempt in 1..=REPAIR_ATTEMPTS {
            let (raw_json, res) = self
                .create_message(self.request(Self::repair_prompt(&last_text)))
                .await?;

            let parsed = match Self::response_tool_narrative(&res)? {
                Some(tool) => tool.validate_and_into_narrative(),
                None => json::parse_narrative(&Self::response_text(&res)),
            };
            match parsed {
                Ok(narrative) => return Ok(narrative),
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        horizon = %input.horizon,
                        error = %err,
                        "narrative still invalid after repair attempt"
                    );
                    last_err = err;
                    last_text = Self::response_text(&res);
                    last_raw_json = raw_json;
                }
            }
        }

        Err(LlmDiagnosticsError {
            provider: Provider::Anthropic,
            stage: "parse_after_repair",
            detail: format!("final_error={last_err}"),
            raw_output: Some(last_text),
            raw_response_json: Some(last_raw_json),
        }
        .into())
    }
}

fn agent_ids() -> Vec<&'static str> {
    AgentKind::ALL.iter().map(AgentKind::id).collect()
}

#[async_trait::async_trait]
impl BriefNarrator for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn narrate(&self, input: &NarrativeInput) -> anyhow::Result<Narrative> {
        let (raw_json, res) = self
            .create_message(self.request(Self::user_prompt(input)))
            .await?;

        if let Some(tool) = Self::response_tool_narrative(&res)? {
            match tool.validate_and_into_narrative() {
                Ok(narrative) => return Ok(narrative),
                Err(err) => {
                    tracing::warn!(horizon = %input.horizon, error = %err, "tool narrative invalid; repairing");
                    let text = serde_json::to_string(&raw_json).unwrap_or_default();
                    return self.try_parse_with_repairs(input, text, raw_json).await;
                }
            }
        }

        // Text fallback (should be rare with forced tool choice).
        let text = Self::response_text(&res);
        self.try_parse_with_repairs(input, text, raw_json).await
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}
