//! Value paths used in decode and encode error messages.
//!
//! A path is rooted at `$`; record fields render as `.name`, array positions
//! as `[3]` and map keys as `["key"]`, so `$.friends[2].name` names the
//! `name` field of the third element of the `friends` array.

use std::fmt::Write;

/// One step from a value to one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// A record field
    Field(&'a str),
    /// An array element
    Index(usize),
    /// A map entry
    Key(&'a str),
}

/// Render a path from the root to the current value.
pub fn render_path(segments: &[PathSegment<'_>]) -> String {
    let mut out = String::from("$");
    for segment in segments {
        // Writing into a String cannot fail
        let _ = match segment {
            PathSegment::Field(name) => write!(out, ".{}", name),
            PathSegment::Index(index) => write!(out, "[{}]", index),
            PathSegment::Key(key) => write!(out, "[{:?}]", key),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_root() {
        assert_eq!(render_path(&[]), "$");
    }

    #[test]
    fn test_render_nested() {
        let segments = [
            PathSegment::Field("friends"),
            PathSegment::Index(2),
            PathSegment::Field("name"),
        ];
        assert_eq!(render_path(&segments), "$.friends[2].name");
    }

    #[test]
    fn test_render_map_key_is_quoted() {
        let segments = [PathSegment::Field("attrs"), PathSegment::Key("a\"b")];
        assert_eq!(render_path(&segments), r#"$.attrs["a\"b"]"#);
    }
}
