//! Resource handlers: every Jira project is exposed as a JSON resource
//! listing its most recent issues.

use std::sync::Arc;

use jira_mcp_core::{IssueTracker, Project, SearchQuery};

use crate::protocol::{
    JsonRpcError, ReadResourceResult, ResourceContents, ResourceDefinition, ResourceTemplate,
    ResourceTemplatesListResult, ResourcesListResult,
};

/// MIME type of every resource this server exposes.
pub const RESOURCE_MIME_TYPE: &str = "application/json";

const URI_SCHEME: &str = "jira://";
const URI_SUFFIX: &str = "/issues";

/// Number of issues returned when reading a project resource.
const ISSUES_PER_RESOURCE: u32 = 50;

/// URI of the issues resource for a project.
pub fn issues_uri(project_key: &str) -> String {
    format!("{}{}{}", URI_SCHEME, project_key, URI_SUFFIX)
}

/// Extract the project key from `jira://{KEY}/issues`.
pub fn parse_issues_uri(uri: &str) -> Option<&str> {
    let key = uri.strip_prefix(URI_SCHEME)?.strip_suffix(URI_SUFFIX)?;
    if key.is_empty() || key.contains('/') {
        None
    } else {
        Some(key)
    }
}

fn project_resource(project: &Project) -> ResourceDefinition {
    ResourceDefinition {
        uri: issues_uri(&project.key),
        name: format!("Issues in {}", project.name),
        description: Some(format!("All issues in the {} project", project.name)),
        mime_type: Some(RESOURCE_MIME_TYPE.to_string()),
    }
}

/// Serves resources/list, resources/read and resources/templates/list.
pub struct ResourceHandler {
    tracker: Arc<dyn IssueTracker>,
}

impl ResourceHandler {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    /// One resource per visible project.
    pub async fn list(&self) -> Result<ResourcesListResult, JsonRpcError> {
        let projects = self.tracker.list_projects().await.map_err(|e| {
            tracing::warn!("Failed to list projects: {}", e);
            JsonRpcError::internal_error(format!("Failed to list Jira projects: {}", e))
        })?;

        tracing::debug!("Listing {} project resources", projects.len());

        Ok(ResourcesListResult {
            resources: projects.iter().map(project_resource).collect(),
        })
    }

    /// Latest issues of the project named by `uri`, newest first.
    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult, JsonRpcError> {
        let project_key = parse_issues_uri(uri).ok_or_else(|| {
            JsonRpcError::invalid_request(format!("Invalid Jira resource URI: {}", uri))
        })?;

        let query = SearchQuery {
            jql: format!("project = {} ORDER BY created DESC", project_key),
            max_results: ISSUES_PER_RESOURCE,
            start_at: 0,
        };

        let results = self.tracker.search_issues(query).await.map_err(|e| {
            tracing::warn!("Failed to read {}: {}", uri, e);
            JsonRpcError::internal_error(format!("Failed to read Jira resource: {}", e))
        })?;

        let text = serde_json::to_string_pretty(&results.issues).map_err(|e| {
            JsonRpcError::internal_error(format!("Failed to read Jira resource: {}", e))
        })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: RESOURCE_MIME_TYPE.to_string(),
                text,
            }],
        })
    }

    /// The URI template clients can fill in without listing first.
    pub fn templates(&self) -> ResourceTemplatesListResult {
        ResourceTemplatesListResult {
            resource_templates: vec![ResourceTemplate {
                uri_template: issues_uri("{projectKey}"),
                name: "Project issues".to_string(),
                description: Some(
                    "The 50 most recently created issues in a Jira project".to_string(),
                ),
                mime_type: Some(RESOURCE_MIME_TYPE.to_string()),
            }],
        }
    }
}
