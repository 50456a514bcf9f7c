//! GraphQL client modules.
//!
//! This module provides the transport to the workspace's hosted GraphQL
//! API and the query/mutation builders used against it.

pub mod graphql;
pub mod queries;

pub use graphql::{ClientConfig, GraphQlExecutor, HttpGraphQlClient};
