//! Business logic services

pub mod readiness;
pub mod resolution;
pub mod reward_fetcher;

pub use readiness::ReadinessProbe;
pub use resolution::{RejectReason, Resolution, ResolutionPolicy, RewardQuery, TemplateTier};
pub use reward_fetcher::{EndpointKind, FetchOutcome, RewardFetcher, RewardProvider};
