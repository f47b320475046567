//! In-memory tracker used by the handler and server unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use jira_mcp_core::{
    CreateIssueInput, CreatedIssue, Error, Issue, IssueFields, IssueTracker, IssueUpdate, Project,
    Result, SearchQuery, SearchResults, Status, Transition,
};
use serde_json::Map;

/// A recorded tracker call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListProjects,
    Search(SearchQuery),
    Create(CreateIssueInput),
    Update(String, IssueUpdate),
    GetTransitions(String),
    Transition(String, String),
    GetIssue(String),
}

#[derive(Default)]
pub struct FakeTracker {
    pub projects: Vec<Project>,
    pub issues: Vec<Issue>,
    pub transitions: Vec<Transition>,
    /// Every call fails with this HTTP status when set.
    pub fail_status: Option<u16>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeTracker {
    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.fail_status {
            Some(status) => Err(Error::from_status(
                status,
                format!("upstream returned {}", status),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.record(Call::ListProjects)?;
        Ok(self.projects.clone())
    }

    async fn search_issues(&self, query: SearchQuery) -> Result<SearchResults> {
        self.record(Call::Search(query))?;
        Ok(SearchResults {
            issues: self.issues.clone(),
            total: Some(self.issues.len() as u32),
            ..Default::default()
        })
    }

    async fn create_issue(&self, input: CreateIssueInput) -> Result<CreatedIssue> {
        let key = format!("{}-101", input.project_key);
        self.record(Call::Create(input))?;
        Ok(CreatedIssue {
            id: "10101".to_string(),
            key,
            self_url: None,
        })
    }

    async fn update_issue(&self, key: &str, update: IssueUpdate) -> Result<()> {
        self.record(Call::Update(key.to_string(), update))
    }

    async fn get_transitions(&self, key: &str) -> Result<Vec<Transition>> {
        self.record(Call::GetTransitions(key.to_string()))?;
        Ok(self.transitions.clone())
    }

    async fn transition_issue(&self, key: &str, transition_id: &str) -> Result<()> {
        self.record(Call::Transition(
            key.to_string(),
            transition_id.to_string(),
        ))
    }

    async fn get_issue(&self, key: &str) -> Result<Issue> {
        self.record(Call::GetIssue(key.to_string()))?;
        self.issues
            .iter()
            .find(|issue| issue.key == key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Issue {} does not exist", key)))
    }

    fn tracker_name(&self) -> &'static str {
        "fake"
    }
}

pub fn sample_project(key: &str, name: &str) -> Project {
    Project {
        id: format!("1{}", key.len()),
        key: key.to_string(),
        name: name.to_string(),
        extra: Map::new(),
    }
}

pub fn sample_status(name: &str) -> Status {
    Status {
        name: name.to_string(),
        status_category: None,
        extra: Map::new(),
    }
}

pub fn sample_issue(key: &str, summary: &str, status: &str) -> Issue {
    Issue {
        id: "10001".to_string(),
        key: key.to_string(),
        self_url: None,
        fields: IssueFields {
            summary: Some(summary.to_string()),
            status: Some(sample_status(status)),
            ..Default::default()
        },
        extra: Map::new(),
    }
}

pub fn sample_transition(id: &str, name: &str, to: &str) -> Transition {
    Transition {
        id: id.to_string(),
        name: name.to_string(),
        to: Some(sample_status(to)),
    }
}
