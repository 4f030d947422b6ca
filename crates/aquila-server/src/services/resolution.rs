//! Picks the page to serve for a reward request
//!
//! ```text
//! Start -> Validating -> Rejected(400)
//!                     -> Fetching -> Rejected(404)
//!                                 -> Rendering(primary)         retailer template, else default
//!                                 -> Rendering(error fallback)  retailer "error" template, else default error
//! ```
//!
//! Upstream failures never reach the caller as a 5xx; they end in a 200 error
//! page. Only a confirmed missing reward is passed on, as a 404.

use std::sync::Arc;

use aquila::{DEFAULT_ERROR_TEMPLATE, DEFAULT_TEMPLATE, RenderContext};
use aquila_templates::TemplateCache;
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::metrics::{NOT_APPLICABLE, RewardRequestLabels};
use crate::services::reward_fetcher::{EndpointKind, FetchOutcome, RewardProvider};

/// Slug of the retailer template used when the provider fails
pub const ERROR_TEMPLATE_SLUG: &str = "error";

/// Query parameters of a reward request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RewardQuery {
    pub retailer: Option<String>,
    pub reward: Option<String>,
}

impl RewardQuery {
    pub fn new(retailer: impl Into<String>, reward: impl Into<String>) -> Self {
        Self {
            retailer: Some(retailer.into()),
            reward: Some(reward.into()),
        }
    }

    fn retailer(&self) -> Option<&str> {
        self.retailer.as_deref().filter(|s| !s.is_empty())
    }

    fn reward(&self) -> Option<&str> {
        self.reward.as_deref().filter(|s| !s.is_empty())
    }
}

/// Where the rendered template came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateTier {
    /// The retailer's own template, with its slug
    Retailer(String),
    Default,
    RetailerError,
    DefaultError,
}

impl TemplateTier {
    /// Value of the `response_template` metric label
    pub fn label(&self) -> &str {
        match self {
            TemplateTier::Retailer(slug) => slug,
            TemplateTier::Default => "default",
            TemplateTier::RetailerError => ERROR_TEMPLATE_SLUG,
            TemplateTier::DefaultError => "default_error",
        }
    }
}

/// Why a request was refused without rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingParameters,
    RewardNotFound,
}

impl RejectReason {
    pub fn status(&self) -> StatusCode {
        match self {
            RejectReason::MissingParameters => StatusCode::BAD_REQUEST,
            RejectReason::RewardNotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<RejectReason> for ApiError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::MissingParameters => ApiError::MissingParameters,
            RejectReason::RewardNotFound => ApiError::RewardNotFound,
        }
    }
}

/// Outcome of resolving a reward request
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    RenderWith {
        retailer: String,
        body: String,
        tier: TemplateTier,
        context: RenderContext,
    },
    Reject {
        reason: RejectReason,
        retailer: Option<String>,
    },
}

impl Resolution {
    /// Metric labels for this outcome
    pub fn labels(&self) -> RewardRequestLabels {
        match self {
            Resolution::RenderWith { retailer, tier, .. } => {
                RewardRequestLabels::new(retailer.as_str(), StatusCode::OK.as_u16(), tier.label())
            }
            Resolution::Reject { reason, retailer } => RewardRequestLabels::new(
                retailer.as_deref().unwrap_or(NOT_APPLICABLE),
                reason.status().as_u16(),
                NOT_APPLICABLE,
            ),
        }
    }

    /// Final HTML, or the error to answer with instead
    pub fn render(self) -> Result<String> {
        match self {
            Resolution::RenderWith {
                retailer,
                body,
                context,
                ..
            } => aquila::render(&body, &context)
                .map_err(|source| ApiError::Render { retailer, source }),
            Resolution::Reject { reason, .. } => Err(reason.into()),
        }
    }
}

/// Combines the reward provider and template cache into a page choice
pub struct ResolutionPolicy {
    templates: Arc<TemplateCache>,
    provider: Arc<dyn RewardProvider>,
}

impl ResolutionPolicy {
    pub fn new(templates: Arc<TemplateCache>, provider: Arc<dyn RewardProvider>) -> Self {
        Self {
            templates,
            provider,
        }
    }

    /// Resolve a request.
    ///
    /// Fails only when the provider's expiry date cannot be reformatted.
    pub async fn resolve(&self, query: &RewardQuery, kind: EndpointKind) -> Result<Resolution> {
        let (Some(retailer), Some(reward_id)) = (query.retailer(), query.reward()) else {
            info!(
                retailer = query.retailer().unwrap_or(NOT_APPLICABLE),
                reward = query.reward().unwrap_or(NOT_APPLICABLE),
                "Missing required query params"
            );
            return Ok(Resolution::Reject {
                reason: RejectReason::MissingParameters,
                retailer: query.retailer().map(str::to_string),
            });
        };

        match self.provider.fetch(retailer, reward_id, kind).await {
            FetchOutcome::NotFound => Ok(Resolution::Reject {
                reason: RejectReason::RewardNotFound,
                retailer: Some(retailer.to_string()),
            }),
            FetchOutcome::Success(payload) => {
                let context =
                    payload
                        .render_context()
                        .map_err(|source| ApiError::InvalidReward {
                            retailer: retailer.to_string(),
                            source,
                        })?;
                let slug = payload.template_slug();

                if let Some(body) = self.templates.lookup(retailer, slug).await {
                    debug!(retailer, slug, "Rendering template from blob storage");
                    return Ok(Resolution::RenderWith {
                        retailer: retailer.to_string(),
                        body,
                        tier: TemplateTier::Retailer(slug.to_string()),
                        context,
                    });
                }

                debug!(retailer, slug, "Template not found, falling back to default template");
                Ok(Resolution::RenderWith {
                    retailer: retailer.to_string(),
                    body: DEFAULT_TEMPLATE.to_string(),
                    tier: TemplateTier::Default,
                    context,
                })
            }
            FetchOutcome::UpstreamError { .. } | FetchOutcome::Unreachable { .. } => {
                Ok(self.error_page(retailer).await)
            }
        }
    }

    async fn error_page(&self, retailer: &str) -> Resolution {
        let (body, tier) = match self.templates.lookup(retailer, ERROR_TEMPLATE_SLUG).await {
            Some(body) => (body, TemplateTier::RetailerError),
            None => (DEFAULT_ERROR_TEMPLATE.to_string(), TemplateTier::DefaultError),
        };

        Resolution::RenderWith {
            retailer: retailer.to_string(),
            body,
            tier,
            context: RenderContext::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_labels() {
        assert_eq!(TemplateTier::Retailer("test-template".into()).label(), "test-template");
        assert_eq!(TemplateTier::Default.label(), "default");
        assert_eq!(TemplateTier::RetailerError.label(), "error");
        assert_eq!(TemplateTier::DefaultError.label(), "default_error");
    }

    #[test]
    fn test_reject_labels() {
        let missing = Resolution::Reject {
            reason: RejectReason::MissingParameters,
            retailer: None,
        };
        assert_eq!(missing.labels(), RewardRequestLabels::new("N/A", 400, "N/A"));

        let not_found = Resolution::Reject {
            reason: RejectReason::RewardNotFound,
            retailer: Some("test-retailer".into()),
        };
        assert_eq!(
            not_found.labels(),
            RewardRequestLabels::new("test-retailer", 404, "N/A")
        );
        assert!(matches!(not_found.render(), Err(ApiError::RewardNotFound)));
    }

    #[test]
    fn test_broken_template_is_a_render_error() {
        let resolution = Resolution::RenderWith {
            retailer: "test-retailer".into(),
            body: "{% for %}".into(),
            tier: TemplateTier::Retailer("test-template".into()),
            context: RenderContext::new(),
        };

        match resolution.render() {
            Err(ApiError::Render { retailer, .. }) => assert_eq!(retailer, "test-retailer"),
            other => panic!("Expected Render error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_query_values_count_as_missing() {
        let query = RewardQuery {
            retailer: Some(String::new()),
            reward: Some("abc".into()),
        };
        assert_eq!(query.retailer(), None);
        assert_eq!(query.reward(), Some("abc"));
    }
}
