//! Quotabar Client - premium request quota fetching
//!
//! This crate talks to the quota endpoint:
//! - Error: typed failure taxonomy with retryability
//! - Transport: HTTP round trip behind a trait
//! - Usage: wire types and normalization into `UsageSnapshot`
//! - Client: single-flight fetch with bounded exponential backoff

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod retry;
pub mod transport;
pub mod usage;

pub use client::UsageClient;
pub use error::{classify_status, classify_transport, ErrorKind, FetchError, Result, TransportCode};
pub use retry::{RequestOptions, RetryPolicy};
pub use transport::{
    Credential, HttpResponse, HttpTransport, QuotaTransport, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT,
};
pub use usage::{
    normalize, resolve_budget_total, BudgetConfig, QuotaDocument, UsageSnapshot,
    REQUESTS_PER_DOLLAR, UNLIMITED_TOTAL,
};
