use std::time::Duration;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

const DEFAULT_MAX_PARALLELISM: usize = 10;

fn default_max_parallelism() -> usize {
    DEFAULT_MAX_PARALLELISM
}

/// Configuration for operation execution
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ExecutionConfig {
    /// Maximum number of resolvers running at the same time for one request; defaults to 10.
    /// Also caps how many elements of a single list are executed at once.
    #[serde(default = "default_max_parallelism")]
    #[schemars(default = "default_max_parallelism")]
    pub max_parallelism: usize,

    /// Timeout for resolvers of long-lived subscriptions, in human-readable format; 0s disables it.
    #[serde(
        deserialize_with = "humantime_serde::deserialize",
        serialize_with = "humantime_serde::serialize"
    )]
    #[schemars(with = "String")]
    pub subscribe_resolver_timeout: Duration,

    /// Adds an `extensions.code` entry to the errors raised by the engine itself.
    pub include_error_codes: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[buildstructor::buildstructor]
impl ExecutionConfig {
    #[builder]
    pub fn new(
        max_parallelism: Option<usize>,
        subscribe_resolver_timeout: Option<Duration>,
        include_error_codes: Option<bool>,
    ) -> Self {
        Self {
            max_parallelism: max_parallelism.unwrap_or_else(default_max_parallelism),
            subscribe_resolver_timeout: subscribe_resolver_timeout.unwrap_or_default(),
            include_error_codes: include_error_codes.unwrap_or_default(),
        }
    }

    /// Size of the admission pools. A zero capacity would deadlock every request, so it is
    /// raised to one.
    pub(crate) fn capacity(&self) -> usize {
        self.max_parallelism.max(1)
    }
}
