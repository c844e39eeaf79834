//! Endpoint templates: parsing, candidate selection and typed matching.
//!
//! A template is a `/`-separated path where a segment starting with `:`
//! is a parameter, optionally typed with `<str>` or `<int>`:
//!
//! ```text
//! /items/:id<int>/tags/:tag
//! ```
//!
//! Matching happens in two phases:
//!
//! 1. **Candidate selection**: every template is turned into an anchored
//!    regex with each parameter replaced by `[^/]+`. The first registered
//!    template whose regex matches the literal path is the candidate.
//! 2. **Typed matching**: the candidate is matched segment by segment and
//!    each parameter is coerced to its declared type. An `<int>` segment that
//!    is not an integer fails the whole match; it does *not* fall through to
//!    later templates.

use crate::dispatcher::{Candidate, Key};
use crate::resolve;
use crate::server::MAX_INLINE_PARAMS;
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Declared type of a path parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Text, passed through unchanged (the default)
    Str,
    /// Integer; optional leading `-`, ASCII digits, must fit in `i64`
    Int,
}

/// One `/`-separated piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment at the same position
    Literal(String),
    /// Captures the path segment at the same position
    Param {
        /// Parameter name (without `:` and type suffix)
        name: Arc<str>,
        /// Declared type
        kind: ParamKind,
    },
}

/// Extracted, type-coerced path parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `<str>` or untyped parameter
    Str(String),
    /// `<int>` parameter
    Int(i64),
}

impl ParamValue {
    /// The text value of a `<str>` parameter.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            ParamValue::Int(_) => None,
        }
    }

    /// The integer value of an `<int>` parameter.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(n) => Some(*n),
            ParamValue::Str(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{n}"),
        }
    }
}

/// Extracted path parameters in template order.
pub type PathParams = SmallVec<[(Arc<str>, ParamValue); MAX_INLINE_PARAMS]>;

/// Template malformed at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// `:` or `:<int>` with no parameter name
    EmptyParamName {
        /// The offending template
        template: String,
    },
    /// Type other than `str` or `int`
    UnknownParamType {
        /// The offending template
        template: String,
        /// Parameter name
        name: String,
        /// The type that was given
        kind: String,
    },
    /// `<` without a closing `>`, or text after the `>`
    MalformedParam {
        /// The offending template
        template: String,
        /// The offending segment
        segment: String,
    },
    /// The derived candidate pattern did not compile
    InvalidPattern {
        /// The offending template
        template: String,
        /// Regex compiler message
        message: String,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::EmptyParamName { template } => {
                write!(f, "endpoint template '{template}' has a parameter without a name")
            }
            TemplateError::UnknownParamType {
                template,
                name,
                kind,
            } => write!(
                f,
                "endpoint template '{template}': parameter '{name}' has unknown type '{kind}' \
                (expected 'str' or 'int')"
            ),
            TemplateError::MalformedParam { template, segment } => write!(
                f,
                "endpoint template '{template}': malformed parameter segment '{segment}'"
            ),
            TemplateError::InvalidPattern { template, message } => write!(
                f,
                "endpoint template '{template}' does not yield a valid pattern: {message}"
            ),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Parse one `:name[<type>]` segment (the leading `:` already stripped).
fn parse_param(template: &str, segment: &str, spec: &str) -> Result<Segment, TemplateError> {
    let (name, kind) = match spec.find('<') {
        None => (spec, ParamKind::Str),
        Some(open) => {
            let Some(kind) = spec[open + 1..].strip_suffix('>') else {
                return Err(TemplateError::MalformedParam {
                    template: template.to_string(),
                    segment: segment.to_string(),
                });
            };
            let name = &spec[..open];
            let kind = match kind {
                "" | "str" => ParamKind::Str,
                "int" => ParamKind::Int,
                other => {
                    return Err(TemplateError::UnknownParamType {
                        template: template.to_string(),
                        name: name.to_string(),
                        kind: other.to_string(),
                    })
                }
            };
            (name, kind)
        }
    };

    if name.is_empty() {
        return Err(TemplateError::EmptyParamName {
            template: template.to_string(),
        });
    }
    if name.contains(['<', '>']) {
        return Err(TemplateError::MalformedParam {
            template: template.to_string(),
            segment: segment.to_string(),
        });
    }

    Ok(Segment::Param {
        name: Arc::from(name),
        kind,
    })
}

/// Strict integer parse: optional `-`, then ASCII digits only.
fn parse_int(text: &str) -> Option<i64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// A compiled endpoint template.
#[derive(Debug, Clone)]
pub struct EndpointTemplate {
    source: Arc<str>,
    segments: Vec<Segment>,
    candidate: Regex,
}

impl EndpointTemplate {
    /// Parse `template` into segments and derive its candidate regex.
    ///
    /// # Errors
    ///
    /// [`TemplateError`] for unnamed, untyped-but-bracketed or unknown-typed
    /// parameters.
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::with_capacity(template.matches('/').count() + 1);
        let mut pattern = String::with_capacity(template.len() + 8);
        pattern.push('^');

        for (idx, segment) in template.split('/').enumerate() {
            if idx > 0 {
                pattern.push('/');
            }
            match segment.strip_prefix(':') {
                Some(spec) => {
                    segments.push(parse_param(template, segment, spec)?);
                    pattern.push_str("[^/]+");
                }
                None => {
                    pattern.push_str(&regex::escape(segment));
                    segments.push(Segment::Literal(segment.to_string()));
                }
            }
        }
        pattern.push('$');

        let candidate = Regex::new(&pattern).map_err(|e| TemplateError::InvalidPattern {
            template: template.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source: Arc::from(template),
            segments,
            candidate,
        })
    }

    /// The template text as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Shared handle to the template text.
    #[must_use]
    pub fn source(&self) -> Arc<str> {
        Arc::clone(&self.source)
    }

    /// Parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Anchored regex used for candidate selection.
    #[must_use]
    pub fn candidate_regex(&self) -> &Regex {
        &self.candidate
    }

    /// Match a literal path and extract typed parameters.
    ///
    /// Fails when the segment counts differ, a literal segment differs, a
    /// parameter segment is empty, or an `<int>` segment is not an integer.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let parts = path.split('/');
        if parts.clone().count() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(expected) => {
                    if expected != part {
                        return None;
                    }
                }
                Segment::Param { name, kind } => {
                    if part.is_empty() {
                        return None;
                    }
                    let value = match kind {
                        ParamKind::Str => ParamValue::Str(part.to_string()),
                        ParamKind::Int => ParamValue::Int(parse_int(part)?),
                    };
                    params.push((Arc::clone(name), value));
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for EndpointTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A successful typed match, bound to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMatch {
    /// The template that matched
    pub template: Arc<str>,
    /// Extracted parameters in template order
    pub params: PathParams,
}

impl EndpointMatch {
    /// Get a parameter by name.
    ///
    /// Uses "last write wins" semantics when a name repeats in the template.
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Parameters as a JSON object.
    #[must_use]
    pub fn params_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    ParamValue::Str(s) => serde_json::Value::from(s.as_str()),
                    ParamValue::Int(n) => serde_json::Value::from(*n),
                };
                (k.to_string(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Ordered set of endpoint templates.
#[derive(Debug, Clone, Default)]
pub struct EndpointMatcher {
    templates: IndexMap<Arc<str>, EndpointTemplate>,
    /// Candidate patterns keyed by template, in registration order
    patterns: Vec<(Key, Regex)>,
}

impl EndpointMatcher {
    /// Create an empty matcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and add `template`. Adding an existing template keeps its position.
    ///
    /// # Errors
    ///
    /// [`TemplateError`] if the template is malformed.
    pub fn insert(&mut self, template: &str) -> Result<&EndpointTemplate, TemplateError> {
        let compiled = EndpointTemplate::compile(template)?;
        let source = compiled.source();
        if !self.templates.contains_key(&source) {
            self.patterns.push((
                Key::Str(Arc::clone(&source)),
                compiled.candidate_regex().clone(),
            ));
        }
        let entry = self.templates.entry(source).or_insert(compiled);
        Ok(entry)
    }

    /// Look up a registered template by its text.
    #[must_use]
    pub fn get(&self, template: &str) -> Option<&EndpointTemplate> {
        self.templates.get(template)
    }

    /// Registered templates in registration order.
    pub fn templates(&self) -> impl Iterator<Item = &EndpointTemplate> {
        self.templates.values()
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no template is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// First registered template whose candidate regex matches `path`.
    ///
    /// The result still has to pass [`EndpointTemplate::match_path`]; a
    /// candidate that fails typed matching is not replaced by a later one.
    #[must_use]
    pub fn find_candidate(&self, path: &str) -> Option<&EndpointTemplate> {
        let search = resolve::match_pattern_against_registered::<()>(&self.patterns);
        let first = resolve::first_or_default::<()>(None);
        let key = resolve::fold(Candidate::from(path), &[&search, &first]).into_key()?;
        self.templates.get(key.as_str()?)
    }
}
