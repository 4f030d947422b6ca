//! Built-in pages used when a retailer has no template of its own

use crate::error::Result;
use crate::render::render;
use crate::reward::{RenderContext, Scalar};

/// Rendered when the requested retailer template does not exist
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/default.html");

/// Rendered when the reward provider failed and the retailer has no `error` template
pub const DEFAULT_ERROR_TEMPLATE: &str = include_str!("../templates/default_error.html");

/// Page for requests refused with an HTTP error status
pub const HTTP_ERROR_TEMPLATE: &str = include_str!("../templates/http_error.html");

/// Render [`HTTP_ERROR_TEMPLATE`] for `status`
pub fn http_error_page(status: u16, reason: &str, message: &str) -> Result<String> {
    let context = RenderContext::from([
        ("status".to_string(), Scalar::Number(status.into())),
        ("reason".to_string(), Scalar::from(reason)),
        ("message".to_string(), Scalar::from(message)),
    ]);
    render(HTTP_ERROR_TEMPLATE, &context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_has_reward_placeholders() {
        for name in ["code", "expiry_date", "pin"] {
            assert!(
                DEFAULT_TEMPLATE.contains(&format!("{{{{ {} }}}}", name)),
                "default.html should show {}",
                name
            );
        }
    }

    #[test]
    fn test_default_error_template_is_static() {
        assert!(!DEFAULT_ERROR_TEMPLATE.contains("{{"));
    }

    #[test]
    fn test_http_error_page() {
        let html = http_error_page(404, "Not Found", "Reward not found").unwrap();

        assert!(html.contains("<title>404 Not Found</title>"));
        assert!(html.contains("<p>Reward not found</p>"));
    }
}
