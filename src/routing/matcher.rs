//! Route template matching
//!
//! Templates are `/`-separated. A segment is either literal text, a
//! `{name}` capture matching one non-empty segment, or a trailing
//! `{name:path}` capture matching the rest of the path (slashes included).

use std::collections::HashMap;

use crate::http::urlencoded::percent_decode_path;

/// One parsed template segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
    Rest(&'a str),
}

fn parse_segment(raw: &str) -> Segment<'_> {
    match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(inner) => match inner.split_once(':') {
            Some((name, "path")) => Segment::Rest(name),
            Some((name, _)) => Segment::Param(name),
            None => Segment::Param(inner),
        },
        None => Segment::Literal(raw),
    }
}

/// Match `path` against `template`, returning the decoded captures.
pub fn match_template(template: &str, path: &str) -> Option<HashMap<String, String>> {
    let mut params = HashMap::new();
    let mut path_segments = path.split('/');

    for (index, raw) in template.split('/').enumerate() {
        match parse_segment(raw) {
            Segment::Rest(name) => {
                // Remainder starts after the `index` leading segments
                let consumed: usize = path.split('/').take(index).map(|s| s.len() + 1).sum();
                let rest = path.get(consumed..)?;
                params.insert(name.to_string(), percent_decode_path(rest));
                return Some(params);
            }
            Segment::Param(name) => {
                let value = path_segments.next().filter(|s| !s.is_empty())?;
                params.insert(name.to_string(), percent_decode_path(value));
            }
            Segment::Literal(text) => {
                if path_segments.next()? != text {
                    return None;
                }
            }
        }
    }

    // Leftover path segments mean the path is longer than the template
    if path_segments.next().is_some() {
        return None;
    }
    Some(params)
}
