//! Materialized path encoding for the department tree.
//!
//! A path is a dot-separated list of segments, one per department from the
//! root down to the node itself. Segments are department ids with every
//! character that `ltree` labels cannot hold replaced by `_`.

use uuid::Uuid;

pub const SEPARATOR: char = '.';

/// Turns an identifier into a label safe for an `ltree` path.
pub fn compute_segment(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Appends `segment` under `parent_path`. An empty parent yields a root path.
pub fn child_path(parent_path: &str, segment: &str) -> String {
    if parent_path.is_empty() {
        segment.to_string()
    } else {
        format!("{}{}{}", parent_path, SEPARATOR, segment)
    }
}

/// Self-or-descendant test, mirroring the `<@` operator.
pub fn is_descendant(candidate: &str, ancestor: &str) -> bool {
    match candidate.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once(SEPARATOR).map(|(parent, _)| parent)
}

pub fn last_segment(path: &str) -> &str {
    path.rsplit_once(SEPARATOR).map_or(path, |(_, last)| last)
}

/// Recovers a UUID from a segment produced by [`compute_segment`].
pub fn segment_to_id(segment: &str) -> Option<Uuid> {
    Uuid::parse_str(&segment.replace('_', "-")).ok()
}

pub fn parent_id(path: &str) -> Option<Uuid> {
    parent_path(path).map(last_segment).and_then(segment_to_id)
}
