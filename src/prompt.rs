//! Prompt template registry.
//!
//! Maps a mode name to a pure string transform. Adding a mode means adding
//! one entry to the registry; nothing else changes.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::error::ServiceError;

pub const DEFAULT_MODE: &str = "text";

type TemplateFn = fn(&str) -> String;

static TEMPLATES: Lazy<BTreeMap<&'static str, TemplateFn>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, TemplateFn> = BTreeMap::new();
    map.insert("text", |q| q.to_string());
    map.insert("ques", |q| format!("Q: {q}\n\nA: "));
    map
});

/// Render `query` through the template registered for `mode`.
///
/// An unregistered mode is rejected rather than silently treated as `text`.
pub fn render(mode: &str, query: &str) -> Result<String, ServiceError> {
    let template = TEMPLATES
        .get(mode)
        .ok_or_else(|| ServiceError::UnknownMode(mode.to_string()))?;
    Ok(template(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mode_is_identity() {
        assert_eq!(render("text", "hello").unwrap(), "hello");
    }

    #[test]
    fn ques_mode_wraps_query() {
        assert_eq!(
            render("ques", "What is 2+2").unwrap(),
            "Q: What is 2+2\n\nA: "
        );
    }

    #[test]
    fn render_is_deterministic() {
        let a = render("ques", "same input").unwrap();
        let b = render("ques", "same input").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = render("chat", "hello").unwrap_err();
        assert!(matches!(err, ServiceError::UnknownMode(m) if m == "chat"));
    }
}
