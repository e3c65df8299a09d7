//! Executes validated GraphQL operations against a resolver graph.
//!
//! The engine walks a pre-planned selection tree, invokes field resolvers
//! concurrently under a request-wide admission limit, assembles the response
//! `data` as raw JSON and collects field errors on the side, following the
//! GraphQL null propagation rules.

#![cfg_attr(feature = "failfast", allow(unreachable_code))]
#![warn(unreachable_pub)]

macro_rules! failfast_debug {
    ($($tokens:tt)+) => {{
        tracing::debug!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

macro_rules! failfast_error {
    ($($tokens:tt)+) => {{
        tracing::error!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

pub mod json_ext;

mod configuration;
mod context;
pub mod error;
mod execution;
pub mod graphql;
pub mod spec;
pub mod trace;

pub use configuration::ExecutionConfig;
pub use context::Context;
pub use context::ContextError;
pub use execution::Request;
pub use graphql::Response;
