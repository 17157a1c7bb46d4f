use crate::errors::ClientError;
use crate::utils::encoding::escape_path_segment;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("route placeholder regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    template: String,
    placeholders: Vec<String>,
}

impl RouteTemplate {
    pub fn parse(template: &str) -> Self {
        let mut placeholders: Vec<String> = Vec::new();
        for caps in PLACEHOLDER_RE.captures_iter(template) {
            let name = &caps[1];
            if !placeholders.iter().any(|p| p.eq_ignore_ascii_case(name)) {
                placeholders.push(name.to_string());
            }
        }
        Self {
            template: template.to_string(),
            placeholders,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }

    pub fn render(&self, bindings: &[(String, String)]) -> Result<String, ClientError> {
        let mut missing: Option<String> = None;
        let rendered = PLACEHOLDER_RE.replace_all(&self.template, |caps: &Captures| {
            let name = &caps[1];
            match bindings
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
            {
                Some((_, value)) => escape_path_segment(value),
                None => {
                    if missing.is_none() {
                        missing = Some(name.to_string());
                    }
                    String::new()
                }
            }
        });
        if let Some(name) = missing {
            return Err(ClientError::configuration(format!(
                "Route '{}' has no value bound for placeholder '{{{}}}'",
                self.template, name
            ))
            .with_hint("Pass a non-null argument (or a structured argument field) with that name."));
        }
        Ok(rendered.into_owned())
    }
}

pub fn join_route(prefix: Option<&str>, route: &str) -> String {
    let route = route.trim_start_matches('/');
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) if route.is_empty() => prefix.to_string(),
        Some(prefix) => format!("{}/{}", prefix, route),
        None => route.to_string(),
    }
}
