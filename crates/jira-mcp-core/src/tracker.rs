//! The issue-tracker capability the MCP server forwards to.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    CreateIssueInput, CreatedIssue, Issue, IssueUpdate, Project, SearchQuery, SearchResults,
    Transition,
};

/// Remote issue tracker (Jira Cloud or Self-Hosted).
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// List every project visible to the authenticated user.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Run a JQL search.
    async fn search_issues(&self, query: SearchQuery) -> Result<SearchResults>;

    /// Create an issue.
    async fn create_issue(&self, input: CreateIssueInput) -> Result<CreatedIssue>;

    /// Edit the fields of an existing issue.
    async fn update_issue(&self, key: &str, update: IssueUpdate) -> Result<()>;

    /// Transitions currently available on an issue.
    async fn get_transitions(&self, key: &str) -> Result<Vec<Transition>>;

    /// Execute a workflow transition.
    async fn transition_issue(&self, key: &str, transition_id: &str) -> Result<()>;

    /// Fetch a single issue by key.
    async fn get_issue(&self, key: &str) -> Result<Issue>;

    /// Short tracker name for logs (e.g., "jira").
    fn tracker_name(&self) -> &'static str;
}
