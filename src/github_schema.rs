//! GitHub GraphQL documents and the typed shape of their responses
//!
//! Fields that are always requested are required; a payload without them is
//! rejected instead of being read as zero. Fields requested behind an
//! `@include` directive are optional.

use crate::repository_exclusion::RepositoryDescriptor;
use serde::Deserialize;
use serde_json::Value;

/// Repositories per page, the GraphQL maximum
pub const REPOSITORIES_PER_PAGE: u32 = 100;

macro_rules! repositories_field {
    () => {
        r#"
    repositories(first: $first, ownerAffiliations: OWNER, orderBy: {direction: DESC, field: STARGAZERS}, after: $after) {
      totalCount
      nodes {
        name
        stargazers {
          totalCount
        }
        isArchived
        isFork
        isPrivate
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }"#
    };
}

/// Profile counters plus the first repository page
pub const STATS_QUERY: &str = concat!(
    r#"
query userInfo($login: String!, $first: Int!, $after: String, $includeMergedPullRequests: Boolean!, $includeDiscussions: Boolean!, $startTime: DateTime) {
  user(login: $login) {
    name
    login
    commits: contributionsCollection(from: $startTime) {
      totalCommitContributions
    }
    reviews: contributionsCollection {
      totalPullRequestReviewContributions
    }
    repositoriesContributedTo(first: 1, contributionTypes: [COMMIT, ISSUE, PULL_REQUEST, REPOSITORY]) {
      totalCount
    }
    pullRequests(first: 1) {
      totalCount
    }
    mergedPullRequests: pullRequests(states: MERGED) @include(if: $includeMergedPullRequests) {
      totalCount
    }
    openIssues: issues(states: OPEN) {
      totalCount
    }
    closedIssues: issues(states: CLOSED) {
      totalCount
    }
    followers {
      totalCount
    }
    repositoryDiscussions @include(if: $includeDiscussions) {
      totalCount
    }
    repositoryDiscussionComments(onlyAnswers: true) @include(if: $includeDiscussions) {
      totalCount
    }"#,
    repositories_field!(),
    r#"
  }
}
"#
);

/// Follow-up query for one more repository page
pub const REPOSITORIES_QUERY: &str = concat!(
    r#"
query userRepositories($login: String!, $first: Int!, $after: String) {
  user(login: $login) {"#,
    repositories_field!(),
    r#"
  }
}
"#
);

/// Envelope with `data` left untyped so `errors` can be checked first
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserData<U> {
    pub user: Option<U>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitContributions {
    pub total_commit_contributions: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewContributions {
    pub total_pull_request_review_contributions: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUser {
    pub name: Option<String>,
    pub login: String,
    pub commits: CommitContributions,
    pub reviews: ReviewContributions,
    pub repositories_contributed_to: TotalCount,
    pub pull_requests: TotalCount,
    pub merged_pull_requests: Option<TotalCount>,
    pub open_issues: TotalCount,
    pub closed_issues: TotalCount,
    pub followers: TotalCount,
    pub repository_discussions: Option<TotalCount>,
    pub repository_discussion_comments: Option<TotalCount>,
    pub repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesUser {
    pub repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnection {
    pub total_count: u64,
    pub nodes: Vec<RepositoryNode>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name: String,
    pub stargazers: TotalCount,
    pub is_archived: bool,
    pub is_fork: bool,
    pub is_private: bool,
}

impl From<RepositoryNode> for RepositoryDescriptor {
    fn from(node: RepositoryNode) -> Self {
        Self {
            name: node.name,
            star_count: node.stargazers.total_count,
            is_archived: node.is_archived,
            is_fork: node.is_fork,
            is_private: node.is_private,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// REST commit search body; only the fields the fetcher reads
#[derive(Debug, Deserialize)]
pub struct CommitSearchResult {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub error: Option<Value>,
}
