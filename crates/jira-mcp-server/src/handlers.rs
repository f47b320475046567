//! Tool handlers for MCP server.
//!
//! This module implements the tool execution logic: arguments are decoded
//! into typed params, forwarded to the issue tracker, and the tracker's
//! answer is returned as pretty-printed JSON text.

use std::sync::Arc;

use jira_mcp_core::{
    CreateIssueInput, IssueTracker, IssueUpdate, SearchQuery, DEFAULT_MAX_RESULTS,
};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::protocol::{JsonRpcError, ToolCallResult, ToolDefinition};

/// Tool handler that executes tools against an issue tracker.
pub struct ToolHandler {
    tracker: Arc<dyn IssueTracker>,
}

impl ToolHandler {
    /// Create a new tool handler.
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    /// Get available tool definitions.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "search_issues".to_string(),
                description: "Search for Jira issues using JQL".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "jql": {
                            "type": "string",
                            "description": "JQL query string"
                        },
                        "maxResults": {
                            "type": "number",
                            "description": "Maximum number of results to return",
                            "default": DEFAULT_MAX_RESULTS
                        },
                        "startAt": {
                            "type": "number",
                            "description": "Index of the first result to return",
                            "default": 0
                        }
                    },
                    "required": ["jql"]
                }),
            },
            ToolDefinition {
                name: "create_issue".to_string(),
                description: "Create a new Jira issue".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "projectKey": {
                            "type": "string",
                            "description": "Project key (e.g., PROJ)"
                        },
                        "summary": {
                            "type": "string",
                            "description": "Issue summary"
                        },
                        "issueType": {
                            "type": "string",
                            "description": "Issue type (e.g., Bug, Task, Story)"
                        },
                        "description": {
                            "type": "string",
                            "description": "Issue description"
                        },
                        "priority": {
                            "type": "string",
                            "description": "Issue priority (e.g., High, Medium, Low)"
                        },
                        "assignee": {
                            "type": "string",
                            "description": "Assignee email address"
                        }
                    },
                    "required": ["projectKey", "summary", "issueType"]
                }),
            },
            ToolDefinition {
                name: "update_issue".to_string(),
                description: "Update an existing Jira issue".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "issueKey": {
                            "type": "string",
                            "description": "Issue key (e.g., PROJ-123)"
                        },
                        "summary": {
                            "type": "string",
                            "description": "New issue summary"
                        },
                        "description": {
                            "type": "string",
                            "description": "New issue description"
                        },
                        "priority": {
                            "type": "string",
                            "description": "New issue priority"
                        },
                        "assignee": {
                            "type": "string",
                            "description": "New assignee email address"
                        },
                        "status": {
                            "type": "string",
                            "description": "Target status; the matching workflow transition is executed"
                        }
                    },
                    "required": ["issueKey"]
                }),
            },
        ]
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<ToolCallResult, JsonRpcError> {
        match name {
            "search_issues" => self.handle_search_issues(parse_args(arguments)?).await,
            "create_issue" => self.handle_create_issue(parse_args(arguments)?).await,
            "update_issue" => self.handle_update_issue(parse_args(arguments)?).await,
            _ => Err(JsonRpcError::new(
                JsonRpcError::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", name),
            )),
        }
    }

    /// Handle search_issues tool call.
    async fn handle_search_issues(
        &self,
        params: SearchIssuesParams,
    ) -> Result<ToolCallResult, JsonRpcError> {
        let query = SearchQuery {
            jql: required(params.jql, "jql")?,
            max_results: params.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            start_at: params.start_at.unwrap_or(0),
        };

        let results = self
            .tracker
            .search_issues(query)
            .await
            .map_err(api_error)?;

        tracing::debug!(
            "Got {} issues from {}",
            results.issues.len(),
            self.tracker.tracker_name()
        );

        json_result(&results.issues)
    }

    /// Handle create_issue tool call.
    async fn handle_create_issue(
        &self,
        params: CreateIssueParams,
    ) -> Result<ToolCallResult, JsonRpcError> {
        let input = CreateIssueInput {
            project_key: required(params.project_key, "projectKey")?,
            summary: required(params.summary, "summary")?,
            issue_type: required(params.issue_type, "issueType")?,
            description: non_empty(params.description),
            priority: non_empty(params.priority),
            assignee: non_empty(params.assignee),
        };

        let created = self
            .tracker
            .create_issue(input)
            .await
            .map_err(api_error)?;

        tracing::info!("Created issue {}", created.key);

        json_result(&created)
    }

    /// Handle update_issue tool call.
    async fn handle_update_issue(
        &self,
        params: UpdateIssueParams,
    ) -> Result<ToolCallResult, JsonRpcError> {
        let key = issue_key(params.issue_key)?;

        let update = IssueUpdate {
            summary: non_empty(params.summary),
            description: non_empty(params.description),
            priority: non_empty(params.priority),
            assignee: non_empty(params.assignee),
        };

        if !update.is_empty() {
            self.tracker
                .update_issue(&key, update)
                .await
                .map_err(api_error)?;
        }

        if let Some(status) = non_empty(params.status) {
            let transitions = self
                .tracker
                .get_transitions(&key)
                .await
                .map_err(api_error)?;

            match transitions.iter().find(|t| t.matches_status(&status)) {
                Some(transition) => {
                    tracing::info!("Moving {} to '{}' via '{}'", key, status, transition.name);
                    self.tracker
                        .transition_issue(&key, &transition.id)
                        .await
                        .map_err(api_error)?;
                }
                None => {
                    tracing::warn!(
                        "No transition of {} leads to '{}', status left unchanged",
                        key,
                        status
                    );
                }
            }
        }

        let issue = self.tracker.get_issue(&key).await.map_err(api_error)?;
        json_result(&issue)
    }
}

// =============================================================================
// Tool parameter types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchIssuesParams {
    jql: String,
    #[serde(default, deserialize_with = "optional_count")]
    max_results: Option<u32>,
    #[serde(default, deserialize_with = "optional_count")]
    start_at: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIssueParams {
    project_key: String,
    summary: String,
    issue_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateIssueParams {
    issue_key: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Decode tool arguments; absent arguments decode like `{}`.
fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T, JsonRpcError> {
    let arguments = arguments.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(arguments).map_err(|e| JsonRpcError::invalid_params(&e.to_string()))
}

fn required(value: String, field: &str) -> Result<String, JsonRpcError> {
    if value.trim().is_empty() {
        Err(JsonRpcError::invalid_params(&format!(
            "`{}` must not be empty",
            field
        )))
    } else {
        Ok(value)
    }
}

/// Accept `PROJ-123` style keys and numeric issue ids.
fn issue_key(value: String) -> Result<String, JsonRpcError> {
    let key = value.trim();
    let numeric_id = !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit());
    let project_key = key.rsplit_once('-').is_some_and(|(project, number)| {
        project.starts_with(|c: char| c.is_ascii_alphabetic())
            && project.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
            && !number.is_empty()
            && number.bytes().all(|b| b.is_ascii_digit())
    });

    if numeric_id || project_key {
        Ok(key.to_string())
    } else {
        Err(JsonRpcError::invalid_params(&format!(
            "`issueKey` must look like PROJ-123, got '{}'",
            value
        )))
    }
}

/// Non-negative whole number; integral floats such as `10.0` are accepted.
fn optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let count = match number.as_u64() {
        Some(n) => u32::try_from(n).ok(),
        None => number
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= f64::from(u32::MAX))
            .map(|f| f as u32),
    };

    count.map(Some).ok_or_else(|| {
        de::Error::custom(format!(
            "expected a non-negative whole number, got {}",
            number
        ))
    })
}

/// Empty strings mean "not given".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn api_error(e: jira_mcp_core::Error) -> JsonRpcError {
    tracing::warn!("Jira request failed: {}", e);
    JsonRpcError::internal_error(format!("Jira API error: {}", e))
}

fn json_result<T: Serialize>(value: &T) -> Result<ToolCallResult, JsonRpcError> {
    serde_json::to_string_pretty(value)
        .map(ToolCallResult::text)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize result: {}", e)))
}
