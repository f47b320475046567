//! Jira API client implementation.
//!
//! Supports both Jira Cloud (API v3) and Jira Self-Hosted/Data Center (API v2).
//! Flavor comes from [`JiraSettings`]: configured explicitly or detected from
//! the URL (`*.atlassian.net` → Cloud, otherwise → SelfHosted).

use async_trait::async_trait;
use jira_mcp_core::{
    ApiFlavor, CreateIssueInput, CreatedIssue, Error, Issue, IssueTracker, IssueUpdate,
    JiraSettings, Project, Result, SearchQuery, SearchResults, Transition, UserRef,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::adf::text_to_adf;
use crate::types::{
    CreateIssueFields, CreateIssuePayload, IssueTypeName, JiraCloudSearchResponse,
    JiraTransitionsResponse, PriorityName, ProjectKey, TransitionId, TransitionPayload,
    UpdateIssueFields, UpdateIssuePayload,
};

/// Largest page Jira Cloud returns from `/search/jql`.
const CLOUD_PAGE_LIMIT: usize = 100;

/// Jira API client.
pub struct JiraClient {
    base_url: String,
    email: String,
    token: String,
    flavor: ApiFlavor,
    client: reqwest::Client,
}

impl JiraClient {
    /// Create a client for the configured Jira instance.
    pub fn new(settings: &JiraSettings) -> Result<Self> {
        Self::with_base_url(
            build_api_base(&settings.host, settings.flavor),
            settings.email.clone(),
            settings.api_token.clone(),
            settings.flavor,
        )
    }

    /// Create a client with an explicit API base URL (for testing with httpmock).
    /// The base URL is used as-is (no `/rest/api/N` suffix appended).
    pub fn with_base_url(
        base_url: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
        flavor: ApiFlavor,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("jira-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.into(),
            token: token.into(),
            flavor,
            client,
        })
    }

    /// API flavor this client speaks.
    pub fn flavor(&self) -> ApiFlavor {
        self.flavor
    }

    /// REST API base URL (e.g., `https://x.atlassian.net/rest/api/3`).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build request with auth header.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json");

        match self.flavor {
            // Cloud: Basic auth with email:token
            ApiFlavor::Cloud => builder.basic_auth(&self.email, Some(&self.token)),
            ApiFlavor::SelfHosted => match self.token.split_once(':') {
                Some((user, password)) => builder.basic_auth(user, Some(password)),
                // Personal Access Token
                None => builder.bearer_auth(&self.token),
            },
        }
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(url = url, params = ?query, "Jira GET request");

        let response = self
            .request(reqwest::Method::GET, url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request and parse the JSON reply.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "Jira POST request");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated request whose reply has no body (Jira answers 204).
    async fn send_no_content<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> Result<()> {
        debug!(url = url, method = %method, "Jira request");

        let response = self
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        check_status(response).await.map(|_| ())
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    /// URL of `/issue/{key}` plus optional trailing segments.
    ///
    /// The key is pushed as one percent-encoded path segment, so it can't
    /// escape the issue resource.
    fn issue_url(&self, key: &str, tail: &[&str]) -> Result<String> {
        if key.is_empty() || key == "." || key == ".." {
            return Err(Error::InvalidData(format!("Invalid issue key: '{}'", key)));
        }

        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid Jira URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid Jira URL '{}'", self.base_url)))?
            .pop_if_empty()
            .push("issue")
            .push(key)
            .extend(tail);

        Ok(url.into())
    }

    /// Rich-text value for the current flavor.
    fn rich_text(&self, text: &str) -> Value {
        match self.flavor {
            ApiFlavor::Cloud => text_to_adf(text),
            ApiFlavor::SelfHosted => Value::String(text.to_string()),
        }
    }

    /// Resolve an email address to the user reference Jira expects in
    /// `assignee`: `{"accountId"}` on Cloud, `{"name"}` on Self-Hosted.
    async fn resolve_assignee(&self, email: &str) -> Result<Value> {
        let url = format!("{}/user/search", self.base_url);
        let param = match self.flavor {
            ApiFlavor::Cloud => "query",
            ApiFlavor::SelfHosted => "username",
        };
        let users: Vec<UserRef> = self.get(&url, &[(param, email.to_string())]).await?;

        let user = users
            .iter()
            .find(|u| {
                u.email_address
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .or_else(|| users.first());

        let reference = user.and_then(|u| match self.flavor {
            ApiFlavor::Cloud => u.account_id.as_ref().map(|id| json!({ "accountId": id })),
            ApiFlavor::SelfHosted => u.name.as_ref().map(|name| json!({ "name": name })),
        });

        reference.ok_or_else(|| Error::InvalidData(format!("No Jira user found for '{}'", email)))
    }

    async fn resolve_optional_assignee(&self, email: Option<&str>) -> Result<Option<Value>> {
        match email {
            Some(email) => Ok(Some(self.resolve_assignee(email).await?)),
            None => Ok(None),
        }
    }

    /// Self-Hosted: GET /search?jql=...&startAt=...&maxResults=...
    async fn search_self_hosted(&self, query: SearchQuery) -> Result<SearchResults> {
        let url = format!("{}/search", self.base_url);
        let params = [
            ("jql", query.jql),
            ("startAt", query.start_at.to_string()),
            ("maxResults", query.max_results.to_string()),
        ];
        self.get(&url, &params).await
    }

    /// Cloud: GET /search/jql pages with `nextPageToken`, so `startAt` is
    /// emulated by skipping results.
    async fn search_cloud(&self, query: SearchQuery) -> Result<SearchResults> {
        let url = format!("{}/search/jql", self.base_url);
        let wanted = query.max_results as usize;
        let mut to_skip = query.start_at as usize;
        let mut issues: Vec<Issue> = Vec::new();
        let mut next_page_token: Option<String> = None;

        while issues.len() < wanted {
            let page_size = (to_skip + wanted - issues.len()).clamp(1, CLOUD_PAGE_LIMIT);
            let mut params = vec![
                ("jql", query.jql.clone()),
                ("maxResults", page_size.to_string()),
                ("fields", "*navigable".to_string()),
            ];
            if let Some(token) = &next_page_token {
                params.push(("nextPageToken", token.clone()));
            }

            let page: JiraCloudSearchResponse = self.get(&url, &params).await?;
            let page_len = page.issues.len();

            for issue in page.issues {
                if to_skip > 0 {
                    to_skip -= 1;
                } else if issues.len() < wanted {
                    issues.push(issue);
                }
            }

            match page.next_page_token {
                Some(token) if page_len > 0 && page.is_last != Some(true) => {
                    next_page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(SearchResults {
            issues,
            start_at: Some(query.start_at),
            max_results: Some(query.max_results),
            total: None,
        })
    }
}

/// Turn a non-success response into an error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status_code = status.as_u16();
    let message = response.text().await.unwrap_or_default();
    warn!(
        status = status_code,
        message = message,
        "Jira API error response"
    );
    Err(Error::from_status(status_code, message))
}

/// Build the API base URL from the instance URL and flavor.
fn build_api_base(url: &str, flavor: ApiFlavor) -> String {
    format!(
        "{}/rest/api/{}",
        url.trim_end_matches('/'),
        flavor.api_version()
    )
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl IssueTracker for JiraClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let url = format!("{}/project", self.base_url);
        let projects: Vec<Project> = self.get(&url, &[]).await?;
        debug!(count = projects.len(), "Fetched projects");
        Ok(projects)
    }

    async fn search_issues(&self, query: SearchQuery) -> Result<SearchResults> {
        if query.max_results == 0 {
            return Ok(SearchResults {
                issues: Vec::new(),
                start_at: Some(query.start_at),
                max_results: Some(0),
                total: None,
            });
        }

        match self.flavor {
            ApiFlavor::Cloud => self.search_cloud(query).await,
            ApiFlavor::SelfHosted => self.search_self_hosted(query).await,
        }
    }

    async fn create_issue(&self, input: CreateIssueInput) -> Result<CreatedIssue> {
        let assignee = self
            .resolve_optional_assignee(input.assignee.as_deref())
            .await?;

        let payload = CreateIssuePayload {
            fields: CreateIssueFields {
                project: ProjectKey {
                    key: input.project_key,
                },
                summary: input.summary,
                issuetype: IssueTypeName {
                    name: input.issue_type,
                },
                description: input.description.as_deref().map(|d| self.rich_text(d)),
                priority: input.priority.map(|name| PriorityName { name }),
                assignee,
            },
        };

        let url = format!("{}/issue", self.base_url);
        let created: CreatedIssue = self.post(&url, &payload).await?;
        debug!(key = created.key, "Created issue");
        Ok(created)
    }

    async fn update_issue(&self, key: &str, update: IssueUpdate) -> Result<()> {
        if update.is_empty() {
            debug!(issue = key, "No field updates, skipping edit");
            return Ok(());
        }

        let assignee = self
            .resolve_optional_assignee(update.assignee.as_deref())
            .await?;

        let payload = UpdateIssuePayload {
            fields: UpdateIssueFields {
                summary: update.summary,
                description: update.description.as_deref().map(|d| self.rich_text(d)),
                priority: update.priority.map(|name| PriorityName { name }),
                assignee,
            },
        };

        let url = self.issue_url(key, &[])?;
        self.send_no_content(reqwest::Method::PUT, &url, &payload)
            .await
    }

    async fn get_transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let url = self.issue_url(key, &["transitions"])?;
        let response: JiraTransitionsResponse = self.get(&url, &[]).await?;
        Ok(response.transitions)
    }

    async fn transition_issue(&self, key: &str, transition_id: &str) -> Result<()> {
        let payload = TransitionPayload {
            transition: TransitionId {
                id: transition_id.to_string(),
            },
        };

        debug!(issue = key, transition_id = transition_id, "Transitioning issue");

        let url = self.issue_url(key, &["transitions"])?;
        self.send_no_content(reqwest::Method::POST, &url, &payload)
            .await
    }

    async fn get_issue(&self, key: &str) -> Result<Issue> {
        let url = self.issue_url(key, &[])?;
        self.get(&url, &[]).await
    }

    fn tracker_name(&self) -> &'static str {
        "jira"
    }
}

// =============================================================================
// Tests
// =============================================================================
