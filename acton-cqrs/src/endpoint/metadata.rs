//! Inspectable description of a bound endpoint

use axum::http::{Method, StatusCode};

use crate::failure::FailureKind;

const FAILURE_KINDS: [FailureKind; 5] = [
    FailureKind::Validation,
    FailureKind::Unauthorized,
    FailureKind::NotFound,
    FailureKind::Conflict,
    FailureKind::Internal,
];

/// Name, route and possible outcomes of one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMetadata {
    name: &'static str,
    display_name: String,
    method: Method,
    pattern: String,
    produces: Vec<StatusCode>,
}

impl EndpointMetadata {
    pub(crate) fn new(name: &'static str, method: Method, pattern: &str, success: StatusCode) -> Self {
        let mut produces = vec![success];
        produces.extend(FAILURE_KINDS.iter().map(FailureKind::status_code));

        Self {
            name,
            display_name: humanize(name),
            method,
            pattern: pattern.to_string(),
            produces,
        }
    }

    /// Stable name of the bound command or query
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Human-readable name, e.g. `Create product`
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// `POST` for commands, `GET` for queries
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Route pattern in axum syntax
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Every status this endpoint can respond with, success first
    pub fn produces(&self) -> &[StatusCode] {
        &self.produces
    }

    /// The one success status
    pub fn success_status(&self) -> StatusCode {
        self.produces[0]
    }
}

/// `CreateProduct` -> `Create product`, `GetProductById` -> `Get product by id`
///
/// Runs of capitals stay together: `ImportCSVFile` -> `Import CSV file`.
pub fn humanize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && (prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
                || next.is_some_and(char::is_lowercase));

        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let acronym = word.chars().count() > 1 && word.chars().all(|c| !c.is_lowercase());
            if acronym {
                word.clone()
            } else if i == 0 {
                let mut chars = word.chars();
                chars
                    .next()
                    .map(|first| first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
                    .unwrap_or_default()
            } else {
                word.to_lowercase()
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
