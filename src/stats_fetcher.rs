//! Stats Fetcher - Aggregates a user's GitHub statistics into one record
//!
//! Issues the combined profile query, walks repository pages in star order,
//! drops excluded repositories, optionally swaps in the commit search count
//! and attaches a rank. Any remote failure aborts the whole fetch.

use crate::error::StatsError;
use crate::github_client::{CommitSearchClient, GitHubClient, GraphQlClient};
use crate::github_schema::{
    CommitSearchResult, GraphQlResponse, PageInfo, RepositoriesUser, RepositoryNode, StatsUser,
    TotalCount, UserData, REPOSITORIES_PER_PAGE, REPOSITORIES_QUERY, STATS_QUERY,
};
use crate::rank::{PercentileRank, Rank, RankCalculator, RankInput};
use crate::repository_exclusion::{ExclusionRules, RepositoryDescriptor};
use crate::stats_config::{ConfigSource, StatsConfig};
use chrono::{SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9-]+$").expect("username pattern is valid"));

/// Options for one fetch
#[derive(Debug, Clone, Default)]
pub struct StatsRequest {
    pub username: String,
    /// Replace the contribution count with a commit search total
    pub include_all_commits: bool,
    /// Repository names to leave out of the star total
    pub excluded_repositories: Vec<String>,
    pub include_merged_prs: bool,
    pub include_discussions: bool,
    /// Start the commit contribution window at January 1st of this year
    pub commits_year: Option<i32>,
}

impl StatsRequest {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn include_all_commits(mut self, value: bool) -> Self {
        self.include_all_commits = value;
        self
    }

    pub fn exclude_repositories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_repositories
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn include_merged_prs(mut self, value: bool) -> Self {
        self.include_merged_prs = value;
        self
    }

    pub fn include_discussions(mut self, value: bool) -> Self {
        self.include_discussions = value;
        self
    }

    pub fn commits_year(mut self, year: Option<i32>) -> Self {
        self.commits_year = year;
        self
    }
}

/// Final statistics for one user; every field is present even when zero
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    pub name: String,
    pub total_commits: u64,
    #[serde(rename = "totalPRs")]
    pub total_prs: u64,
    #[serde(rename = "totalPRsMerged")]
    pub total_prs_merged: u64,
    #[serde(rename = "mergedPRsPercentage")]
    pub merged_prs_percentage: u64,
    pub total_reviews: u64,
    pub total_issues: u64,
    pub total_stars: u64,
    pub contributed_to: u64,
    pub total_discussions_started: u64,
    pub total_discussions_answered: u64,
    pub rank: Rank,
}

/// Running totals owned by a single fetch
#[derive(Debug, Default)]
struct StatsAccumulator {
    name: String,
    commits: u64,
    prs: u64,
    prs_merged: u64,
    reviews: u64,
    open_issues: u64,
    closed_issues: u64,
    stars: u64,
    followers: u64,
    repos: u64,
    contributed_to: u64,
    discussions_started: u64,
    discussions_answered: u64,
}

/// Why repository paging stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStop {
    /// The remote reported no further pages
    LastPage,
    /// Multi-page stars are switched off
    SinglePage,
    /// A zero-star repository was seen; everything after it has zero stars too
    ZeroStarRepository,
}

#[derive(Debug, PartialEq, Eq)]
enum PageStep {
    Next(String),
    Stop(PaginationStop),
}

/// Decide what follows a page that has already been tallied
fn next_page_step(
    page_info: &PageInfo,
    multi_page_stars: bool,
    saw_zero_stars: bool,
) -> Result<PageStep, StatsError> {
    if !page_info.has_next_page {
        return Ok(PageStep::Stop(PaginationStop::LastPage));
    }
    if !multi_page_stars {
        return Ok(PageStep::Stop(PaginationStop::SinglePage));
    }
    // Pages arrive sorted by stars descending.
    if saw_zero_stars {
        return Ok(PageStep::Stop(PaginationStop::ZeroStarRepository));
    }

    match &page_info.end_cursor {
        Some(cursor) => Ok(PageStep::Next(cursor.clone())),
        None => Err(StatsError::MalformedResponse(
            "hasNextPage is set without an endCursor".to_string(),
        )),
    }
}

/// Add the stars of every surviving repository on a page.
///
/// Returns whether the page contained a zero-star repository, checked before
/// exclusion since it relies on the remote ordering.
fn tally_page(
    acc: &mut StatsAccumulator,
    nodes: Vec<RepositoryNode>,
    rules: &ExclusionRules,
    excluded_names: &HashSet<String>,
) -> bool {
    let mut saw_zero_stars = false;

    for node in nodes {
        let repo = RepositoryDescriptor::from(node);

        if repo.star_count == 0 {
            saw_zero_stars = true;
        }

        if excluded_names.contains(&repo.name) || rules.is_excluded_by_policy(&repo) {
            debug!("Excluding repository {} ({} stars)", repo.name, repo.star_count);
            continue;
        }

        acc.stars += repo.star_count;
    }

    saw_zero_stars
}

/// Letters, digits and hyphens only
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_PATTERN.is_match(username)
}

fn commits_window_start(year: i32) -> Option<String> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .map(|start| start.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn malformed(e: serde_json::Error) -> StatsError {
    StatsError::MalformedResponse(e.to_string())
}

fn required_count(value: Option<TotalCount>, field: &str) -> Result<u64, StatsError> {
    value
        .map(|count| count.total_count)
        .ok_or_else(|| StatsError::MalformedResponse(format!("missing field `{field}`")))
}

/// Aggregates statistics through the injected transports
pub struct StatsFetcher {
    graphql: Arc<dyn GraphQlClient>,
    commit_search: Arc<dyn CommitSearchClient>,
    rank_calculator: Arc<dyn RankCalculator>,
    config_source: ConfigSource,
}

impl StatsFetcher {
    /// Fetcher with the default rank calculator, reading the environment on every call
    pub fn new(graphql: Arc<dyn GraphQlClient>, commit_search: Arc<dyn CommitSearchClient>) -> Self {
        Self {
            graphql,
            commit_search,
            rank_calculator: Arc::new(PercentileRank),
            config_source: ConfigSource::Environment,
        }
    }

    pub fn from_github(client: GitHubClient) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client)
    }

    pub fn with_rank_calculator(mut self, rank_calculator: Arc<dyn RankCalculator>) -> Self {
        self.rank_calculator = rank_calculator;
        self
    }

    pub fn with_config_source(mut self, config_source: ConfigSource) -> Self {
        self.config_source = config_source;
        self
    }

    /// Fetch, filter and rank statistics for `request.username`
    pub async fn fetch_stats(&self, request: &StatsRequest) -> Result<StatisticsRecord, StatsError> {
        let username = request.username.as_str();
        if username.is_empty() {
            return Err(StatsError::MissingUsername);
        }
        if request.include_all_commits && !is_valid_username(username) {
            return Err(StatsError::InvalidUsername);
        }

        let config: StatsConfig = self.config_source.load();
        let excluded_names = config
            .exclusion
            .combined_excluded_names(&request.excluded_repositories);

        let start_time = request.commits_year.and_then(|year| {
            let start = commits_window_start(year);
            if start.is_none() {
                warn!("Ignoring out of range commits year {}", year);
            }
            start
        });

        let variables = json!({
            "login": username,
            "first": REPOSITORIES_PER_PAGE,
            "after": Value::Null,
            "includeMergedPullRequests": request.include_merged_prs,
            "includeDiscussions": request.include_discussions,
            "startTime": start_time,
        });
        let user: StatsUser = self.query_user(STATS_QUERY, variables).await?;

        let mut acc = StatsAccumulator {
            name: user.name.filter(|n| !n.is_empty()).unwrap_or(user.login),
            commits: user.commits.total_commit_contributions,
            prs: user.pull_requests.total_count,
            reviews: user.reviews.total_pull_request_review_contributions,
            open_issues: user.open_issues.total_count,
            closed_issues: user.closed_issues.total_count,
            followers: user.followers.total_count,
            repos: user.repositories.total_count,
            contributed_to: user.repositories_contributed_to.total_count,
            ..Default::default()
        };

        if request.include_merged_prs {
            acc.prs_merged = required_count(user.merged_pull_requests, "mergedPullRequests")?;
        }
        if request.include_discussions {
            acc.discussions_started =
                required_count(user.repository_discussions, "repositoryDiscussions")?;
            acc.discussions_answered = required_count(
                user.repository_discussion_comments,
                "repositoryDiscussionComments",
            )?;
        }

        let mut connection = user.repositories;
        let mut pages = 1u32;
        loop {
            let saw_zero_stars =
                tally_page(&mut acc, connection.nodes, &config.exclusion, &excluded_names);

            match next_page_step(&connection.page_info, config.multi_page_stars, saw_zero_stars)? {
                PageStep::Next(cursor) => {
                    pages += 1;
                    debug!("Fetching repository page #{} for {}", pages, username);

                    let variables = json!({
                        "login": username,
                        "first": REPOSITORIES_PER_PAGE,
                        "after": cursor,
                    });
                    let next: RepositoriesUser =
                        self.query_user(REPOSITORIES_QUERY, variables).await?;
                    connection = next.repositories;
                }
                PageStep::Stop(reason) => {
                    debug!(
                        "Stopped repository paging for {} after {} page(s): {:?}",
                        username, pages, reason
                    );
                    break;
                }
            }
        }

        if request.include_all_commits {
            acc.commits = self.fetch_total_commits(username).await?;
        }

        let record = self.finish(acc, request);
        info!(
            "Fetched stats for {}: {} stars, {} commits, rank {}",
            username, record.total_stars, record.total_commits, record.rank.level
        );
        Ok(record)
    }

    /// Run a GraphQL query and pull out `data.user`
    async fn query_user<U: DeserializeOwned>(
        &self,
        document: &str,
        variables: Value,
    ) -> Result<U, StatsError> {
        let body = self.graphql.query(document, variables).await?;
        let response: GraphQlResponse = serde_json::from_value(body).map_err(malformed)?;

        if let Some(first) = response.errors.into_iter().next() {
            return Err(StatsError::Remote {
                message: first.message,
                kind: first.kind,
            });
        }

        let data = response
            .data
            .ok_or_else(|| StatsError::MalformedResponse("missing field `data`".to_string()))?;
        let data: UserData<U> = serde_json::from_value(data).map_err(malformed)?;

        data.user.ok_or(StatsError::UserNotFound)
    }

    async fn fetch_total_commits(&self, username: &str) -> Result<u64, StatsError> {
        let body = self
            .commit_search
            .search_commits(&format!("author:{username}"))
            .await?;

        let result: CommitSearchResult = match serde_json::from_value(body) {
            Ok(result) => result,
            Err(e) => {
                warn!("Unreadable commit search response for {}: {}", username, e);
                return Err(StatsError::CommitFetch);
            }
        };

        if result.error.is_some() {
            return Err(StatsError::CommitFetch);
        }
        result.total_count.ok_or(StatsError::CommitFetch)
    }

    fn finish(&self, acc: StatsAccumulator, request: &StatsRequest) -> StatisticsRecord {
        let total_issues = acc.open_issues + acc.closed_issues;

        let merged_prs_percentage = if request.include_merged_prs && acc.prs > 0 {
            (100.0 * acc.prs_merged as f64 / acc.prs as f64).round() as u64
        } else {
            0
        };

        let rank = self.rank_calculator.calculate(&RankInput {
            all_commits: request.include_all_commits,
            commits: acc.commits,
            prs: acc.prs,
            reviews: acc.reviews,
            issues: total_issues,
            repos: acc.repos,
            stars: acc.stars,
            followers: acc.followers,
        });

        StatisticsRecord {
            name: acc.name,
            total_commits: acc.commits,
            total_prs: acc.prs,
            total_prs_merged: acc.prs_merged,
            merged_prs_percentage,
            total_reviews: acc.reviews,
            total_issues,
            total_stars: acc.stars,
            contributed_to: acc.contributed_to,
            total_discussions_started: acc.discussions_started,
            total_discussions_answered: acc.discussions_answered,
            rank,
        }
    }
}

/// Positional form of [`StatsFetcher::fetch_stats`]
pub async fn fetch_stats(
    fetcher: &StatsFetcher,
    username: &str,
    include_all_commits: bool,
    excluded_repositories: &[String],
    include_merged_prs: bool,
    include_discussions: bool,
) -> Result<StatisticsRecord, StatsError> {
    let request = StatsRequest::new(username)
        .include_all_commits(include_all_commits)
        .exclude_repositories(excluded_repositories.iter().cloned())
        .include_merged_prs(include_merged_prs)
        .include_discussions(include_discussions);

    fetcher.fetch_stats(&request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_info(has_next_page: bool, cursor: Option<&str>) -> PageInfo {
        PageInfo {
            has_next_page,
            end_cursor: cursor.map(String::from),
        }
    }

    #[test]
    fn test_last_page_stops() {
        let step = next_page_step(&page_info(false, None), true, false).unwrap();
        assert_eq!(step, PageStep::Stop(PaginationStop::LastPage));
    }

    #[test]
    fn test_single_page_mode_stops() {
        let step = next_page_step(&page_info(true, Some("c1")), false, false).unwrap();
        assert_eq!(step, PageStep::Stop(PaginationStop::SinglePage));
    }

    #[test]
    fn test_zero_star_stops_even_with_more_pages() {
        let step = next_page_step(&page_info(true, Some("c1")), true, true).unwrap();
        assert_eq!(step, PageStep::Stop(PaginationStop::ZeroStarRepository));
    }

    #[test]
    fn test_cursor_threads_to_next_page() {
        let step = next_page_step(&page_info(true, Some("c1")), true, false).unwrap();
        assert_eq!(step, PageStep::Next("c1".to_string()));
    }

    #[test]
    fn test_missing_cursor_is_malformed() {
        let result = next_page_step(&page_info(true, None), true, false);
        assert!(matches!(result, Err(StatsError::MalformedResponse(_))));
    }

    #[test]
    fn test_username_validation() {
        assert!(is_valid_username("octo-cat42"));
        assert!(!is_valid_username("octo cat"));
        assert!(!is_valid_username("octo_cat"));
        assert!(!is_valid_username("octo/../cat"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn test_commits_window_start_format() {
        assert_eq!(
            commits_window_start(2023).as_deref(),
            Some("2023-01-01T00:00:00Z")
        );
    }
}
