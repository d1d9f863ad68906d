pub mod error;
pub mod github_client;
pub mod github_schema;
pub mod rank;
pub mod repository_exclusion;
pub mod stats_config;
pub mod stats_fetcher;

#[cfg(test)]
mod tests;

pub use error::{StatsError, TransportError};
pub use github_client::{CommitSearchClient, GitHubClient, GraphQlClient};
pub use rank::{PercentileRank, Rank, RankCalculator, RankInput};
pub use repository_exclusion::{
    parse_boolean, parse_quoted_list, parse_regex_list, ExclusionFlags, ExclusionRules,
    RepositoryDescriptor,
};
pub use stats_config::{ConfigSource, StatsConfig, TransportConfig};
pub use stats_fetcher::{fetch_stats, StatisticsRecord, StatsFetcher, StatsRequest};
