//! Jinja rendering of HTML reward templates
//!
//! Retailer templates come out of blob storage as raw Jinja source, so they
//! are compiled per render on a shared [`minijinja::Environment`]. Every
//! template is treated as HTML: values are always auto-escaped, undefined
//! names render as nothing and null payload values count as undefined.
//! Escaping produces the same entities as Jinja's markupsafe.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::LazyLock;

use minijinja::{AutoEscape, Environment, Output, State, Value, escape_formatter};

use crate::error::{Result, RewardError};
use crate::reward::{RenderContext, Scalar};

static ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_keep_trailing_newline(true);
    env.set_formatter(markup_formatter);
    env
});

fn markup_formatter(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> std::result::Result<(), minijinja::Error> {
    if value.is_safe() || !matches!(state.auto_escape(), AutoEscape::Html) {
        return escape_formatter(out, state, value);
    }

    let text = match value.as_str() {
        Some(s) => Cow::Borrowed(s),
        None if value.is_undefined() || value.is_none() => return Ok(()),
        None => Cow::Owned(value.to_string()),
    };
    for c in text.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&#34;")?,
            '\'' => out.write_str("&#39;")?,
            _ => out.write_char(c)?,
        }
    }
    Ok(())
}

/// Render `template` with the values in `context`
pub fn render(template: &str, context: &RenderContext) -> Result<String> {
    let values: BTreeMap<&str, &Scalar> = context
        .iter()
        .filter(|(_, value)| !matches!(value, Scalar::Null))
        .map(|(key, value)| (key.as_str(), value))
        .collect();

    ENV.render_str(template, values)
        .map_err(|e| RewardError::Render {
            reason: e.to_string(),
        })
}
