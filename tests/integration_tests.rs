//! End-to-end tests for the GitHub transport and the stats fetcher.
//!
//! These tests use mockito to stand in for the GitHub API.

use mockito::{Matcher, Server, ServerGuard};
use profile_stats::{
    ConfigSource, GitHubClient, StatsConfig, StatsError, StatsFetcher, StatsRequest,
    TransportConfig, TransportError,
};
use serde_json::json;

fn client_for(server: &ServerGuard) -> GitHubClient {
    GitHubClient::new(&TransportConfig {
        api_url: server.url(),
        token: Some("test-token".to_string()),
        timeout_secs: 5,
    })
    .expect("client should build")
}

fn fixed_config(multi_page_stars: bool, exclude_repo: &str) -> ConfigSource {
    let exclude_repo = exclude_repo.to_string();
    ConfigSource::Fixed(StatsConfig::from_lookup(move |key: &str| match key {
        "FETCH_MULTI_PAGE_STARS" if multi_page_stars => Some("true".to_string()),
        "EXCLUDE_REPO" => Some(exclude_repo.clone()),
        _ => None,
    }))
}

fn repo(name: &str, stars: u64) -> serde_json::Value {
    json!({
        "name": name,
        "stargazers": { "totalCount": stars },
        "isArchived": false,
        "isFork": false,
        "isPrivate": false,
    })
}

fn first_page_body() -> String {
    json!({
        "data": {
            "user": {
                "name": "Mona Lisa",
                "login": "octocat",
                "commits": { "totalCommitContributions": 10 },
                "reviews": { "totalPullRequestReviewContributions": 1 },
                "repositoriesContributedTo": { "totalCount": 2 },
                "pullRequests": { "totalCount": 4 },
                "mergedPullRequests": { "totalCount": 1 },
                "openIssues": { "totalCount": 1 },
                "closedIssues": { "totalCount": 2 },
                "followers": { "totalCount": 8 },
                "repositories": {
                    "totalCount": 3,
                    "nodes": [repo("hello-world", 80), repo("dotfiles", 15)],
                    "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29yOjI=" },
                },
            }
        }
    })
    .to_string()
}

fn second_page_body() -> String {
    json!({
        "data": {
            "user": {
                "repositories": {
                    "totalCount": 3,
                    "nodes": [repo("spoon-knife", 5)],
                    "pageInfo": { "hasNextPage": false, "endCursor": "Y3Vyc29yOjM=" },
                }
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_fetch_stats_over_http() {
    let mut server = Server::new_async().await;

    let first_page = server
        .mock("POST", "/graphql")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Regex("query userInfo".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(first_page_body())
        .create_async()
        .await;

    let second_page = server
        .mock("POST", "/graphql")
        .match_body(Matcher::PartialJson(json!({
            "variables": { "after": "Y3Vyc29yOjI=" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(second_page_body())
        .create_async()
        .await;

    let commit_search = server
        .mock("GET", "/search/commits")
        .match_query(Matcher::UrlEncoded(
            "q".to_string(),
            "author:octocat".to_string(),
        ))
        .match_header("accept", "application/vnd.github.cloak-preview")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"total_count": 1234, "incomplete_results": false, "items": []}"#)
        .create_async()
        .await;

    let fetcher = StatsFetcher::from_github(client_for(&server))
        .with_config_source(fixed_config(true, "'dotfiles'"));
    let request = StatsRequest::new("octocat")
        .include_all_commits(true)
        .include_merged_prs(true);

    let record = fetcher.fetch_stats(&request).await.unwrap();

    first_page.assert_async().await;
    second_page.assert_async().await;
    commit_search.assert_async().await;

    assert_eq!(record.name, "Mona Lisa");
    assert_eq!(record.total_stars, 85);
    assert_eq!(record.total_commits, 1234);
    assert_eq!(record.total_prs_merged, 1);
    assert_eq!(record.merged_prs_percentage, 25);
    assert_eq!(record.total_issues, 3);
}

#[tokio::test]
async fn test_graphql_errors_surface_message() {
    let mut server = Server::new_async().await;

    let _m = server
        .mock("POST", "/graphql")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"user":null},"errors":[{"type":"NOT_FOUND","path":["user"],"message":"Could not resolve to a User with the login of 'nobody-here'."}]}"#,
        )
        .create_async()
        .await;

    let fetcher =
        StatsFetcher::from_github(client_for(&server)).with_config_source(fixed_config(false, ""));

    let err = fetcher
        .fetch_stats(&StatsRequest::new("nobody-here"))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Could not resolve to a User with the login of 'nobody-here'."
    );
    assert!(matches!(err, StatsError::Remote { .. }));
}

#[tokio::test]
async fn test_http_failure_is_transport_error() {
    let mut server = Server::new_async().await;

    let _m = server
        .mock("POST", "/graphql")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"Bad credentials","documentation_url":"https://docs.github.com/graphql"}"#)
        .create_async()
        .await;

    let fetcher =
        StatsFetcher::from_github(client_for(&server)).with_config_source(fixed_config(false, ""));

    let err = fetcher
        .fetch_stats(&StatsRequest::new("octocat"))
        .await
        .unwrap_err();

    match err {
        StatsError::Transport(TransportError::Status { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Bad credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_single_page_issues_one_request() {
    let mut server = Server::new_async().await;

    let graphql = server
        .mock("POST", "/graphql")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(first_page_body())
        .expect(1)
        .create_async()
        .await;

    let fetcher =
        StatsFetcher::from_github(client_for(&server)).with_config_source(fixed_config(false, ""));

    let record = fetcher
        .fetch_stats(&StatsRequest::new("octocat"))
        .await
        .unwrap();

    graphql.assert_async().await;
    assert_eq!(record.total_stars, 95);
    assert_eq!(record.total_commits, 10);
}
