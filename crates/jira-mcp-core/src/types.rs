//! Jira-shaped domain types shared across crates.
//!
//! Response types keep every field Jira sends: the fields the adapter reads
//! are typed, everything else lands in a flattened `extra` map so it is
//! passed back to MCP clients unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default page size for JQL searches.
pub const DEFAULT_MAX_RESULTS: u32 = 50;

// =============================================================================
// Projects
// =============================================================================

/// A Jira project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    /// Project key (e.g., "PROJ")
    pub key: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Issues
// =============================================================================

/// A Jira issue as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    /// Issue key (e.g., "PROJ-123")
    pub key: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(default)]
    pub fields: IssueFields,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Issue fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Plain text (API v2) or an ADF document (API v3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Issue status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
    #[serde(
        rename = "statusCategory",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_category: Option<StatusCategory>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Status category: "new", "indeterminate" or "done".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCategory {
    pub key: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Issue priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Jira user reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// Account ID (Cloud only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Username (Self-Hosted only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of JQL search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// Reference to a newly created issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
}

/// A workflow transition available on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    /// Target status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Status>,
}

impl Transition {
    /// Whether this transition is called `status` or leads to a status called
    /// `status`, ignoring case.
    pub fn matches_status(&self, status: &str) -> bool {
        self.name.eq_ignore_ascii_case(status)
            || self
                .to
                .as_ref()
                .is_some_and(|to| to.name.eq_ignore_ascii_case(status))
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// A JQL search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub jql: String,
    pub max_results: u32,
    pub start_at: u32,
}

impl SearchQuery {
    /// Query with the default page size, starting at the first result.
    pub fn new(jql: impl Into<String>) -> Self {
        Self {
            jql: jql.into(),
            max_results: DEFAULT_MAX_RESULTS,
            start_at: 0,
        }
    }
}

/// Input for creating an issue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateIssueInput {
    pub project_key: String,
    pub summary: String,
    /// Issue type name (e.g., "Bug", "Task")
    pub issue_type: String,
    pub description: Option<String>,
    /// Priority name (e.g., "High")
    pub priority: Option<String>,
    /// Assignee email address
    pub assignee: Option<String>,
}

/// Field edits for an existing issue. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueUpdate {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    /// Assignee email address
    pub assignee: Option<String>,
}

impl IssueUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
    }
}
