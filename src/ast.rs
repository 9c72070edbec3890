//! Source comments attached to schema declarations, consumed as given from
//! the descriptor's location table and re-emitted on the generated items.

use prost_types::source_code_info::Location;

/// Comments on a schema item.
#[derive(Debug, Default, Clone)]
pub struct Comments {
    /// Leading detached blocks of comments.
    pub leading_detached: Vec<String>,

    /// Leading comments.
    pub leading: String,

    /// Trailing comments.
    pub trailing: String,
}

impl Comments {
    pub(crate) fn from_location(location: &Location) -> Comments {
        let leading_detached = location.leading_detached_comments.clone();
        let leading = location
            .leading_comments
            .as_ref()
            .map_or(String::new(), String::clone);
        let trailing = location
            .trailing_comments
            .as_ref()
            .map_or(String::new(), String::clone);
        Comments {
            leading_detached,
            leading,
            trailing,
        }
    }

    /// Appends the detached and leading comments to a buffer with indentation.
    ///
    /// Each level of indentation corresponds to four space (' ') characters.
    pub fn append_with_indent(&self, indent_level: u8, buf: &mut String) {
        for detached_block in &self.leading_detached {
            for line in detached_block.lines() {
                push_comment_line(buf, indent_level, "//", line);
            }
            buf.push('\n');
        }

        for line in self.leading.lines() {
            push_comment_line(buf, indent_level, "///", line);
        }
    }

    /// The trailing comment as a single `//` suffix, or `None` when there is
    /// no trailing comment or it spans multiple lines (multi-line trailing
    /// comments have no clear rendering on a single declaration line).
    pub fn trailing_line(&self) -> Option<String> {
        let s = self.trailing.trim_end_matches('\n');
        if s.is_empty() || s.contains('\n') {
            return None;
        }
        let mut line = String::from("//");
        if !s.starts_with(' ') {
            line.push(' ');
        }
        line.push_str(s);
        Some(line)
    }

    /// Appends a deprecation notice to the leading comments, matching the
    /// schema's own deprecation options: an item marked deprecated, or any
    /// item of a file that is deprecated as a whole.
    pub fn append_deprecation_suffix(&mut self, file_path: &str, file_deprecated: bool, deprecated: bool) {
        if !deprecated && !file_deprecated {
            return;
        }
        if !self.leading.is_empty() && !self.leading.ends_with('\n') {
            self.leading.push('\n');
        }
        if file_deprecated {
            self.leading.push_str(&format!(
                " Deprecated: The entire file {} is marked as deprecated.\n",
                file_path
            ));
        } else {
            self.leading.push_str(&format!(
                " Deprecated: Marked as deprecated in {}.\n",
                file_path
            ));
        }
    }
}

fn push_comment_line(buf: &mut String, indent_level: u8, marker: &str, line: &str) {
    for _ in 0..indent_level {
        buf.push_str("    ");
    }
    buf.push_str(marker);
    if !line.trim().is_empty() && !line.starts_with(' ') {
        buf.push(' ');
    }
    buf.push_str(line);
    buf.push('\n');
}
