//! Utility functions for working with identifiers.

use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};

/// Converts a `camelCase` or `SCREAMING_SNAKE_CASE` identifier to a
/// `lower_snake` case Rust field identifier.
pub fn to_snake(s: &str) -> String {
    let ident = s.to_snake_case();

    // Uses a raw identifier if the identifier matches a Rust keyword
    // (https://doc.rust-lang.org/grammar.html#keywords).
    match ident.as_str() {
        "abstract" | "as" | "async" | "await" | "become" | "box" | "break" | "const"
        | "continue" | "crate" | "do" | "dyn" | "else" | "enum" | "extern" | "false" | "final"
        | "fn" | "for" | "if" | "impl" | "in" | "let" | "loop" | "macro" | "match" | "mod"
        | "move" | "mut" | "override" | "priv" | "pub" | "ref" | "return" | "self" | "static"
        | "struct" | "super" | "trait" | "true" | "try" | "type" | "typeof" | "unsafe"
        | "unsized" | "use" | "virtual" | "where" | "while" | "yield" => format!("r#{}", ident),
        _ => ident,
    }
}

/// Converts a `snake_case` identifier to an `UpperCamel` case Rust type
/// identifier.
pub fn to_upper_camel(s: &str) -> String {
    let ident = s.to_upper_camel_case();

    // Suffix an underscore for the `Self` Rust keyword as it is not allowed as
    // raw identifier.
    if ident == "Self" {
        format!("{}_", ident)
    } else {
        ident
    }
}

/// Matches a 'matcher' against a fully qualified identifier.
pub fn match_ident(matcher: &str, msg: &str, field: Option<&str>) -> bool {
    assert_eq!(b'.', msg.as_bytes()[0]);

    if matcher.is_empty() {
        return false;
    } else if matcher == "." {
        return true;
    }

    let match_paths = matcher.split('.').collect::<Vec<_>>();
    let field_paths = {
        let mut paths = msg.split('.').collect::<Vec<_>>();
        if let Some(field) = field {
            paths.push(field);
        }
        paths
    };

    if &matcher[..1] == "." {
        // Prefix match.
        if match_paths.len() > field_paths.len() {
            false
        } else {
            match_paths[..] == field_paths[..match_paths.len()]
        }
    // Suffix match.
    } else if match_paths.len() > field_paths.len() {
        false
    } else {
        match_paths[..] == field_paths[field_paths.len() - match_paths.len()..]
    }
}

/// Strips an enum's name from one of its value names, yielding the spelling
/// used for the primary value constant when prefix stripping is enabled.
///
/// `strip_enum_value_prefix("Shade", "SHADE_BLACK")` is `"BLACK"`. The prefix
/// is kept when stripping would leave an empty name or one starting with a
/// digit, since neither forms a usable identifier suffix.
pub fn strip_enum_value_prefix(enum_name: &str, value_name: &str) -> String {
    let prefix = enum_name.to_shouty_snake_case();
    let stripped = value_name
        .strip_prefix(prefix.as_str())
        .and_then(|rest| rest.strip_prefix('_'));
    match stripped {
        Some(rest) if !rest.is_empty() && !rest.starts_with(|c: char| c.is_ascii_digit()) => {
            rest.to_string()
        }
        _ => value_name.to_string(),
    }
}

/// Sanitizes a file path into an identifier fragment: every character that is
/// not alphanumeric becomes an underscore, so `dir/foo.proto` yields
/// `dir_foo_proto`.
pub fn sanitize_path(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// The exported descriptor singleton identifier for a file, e.g.
/// `File_dir_foo_proto`. The public-import forwarder skips this identifier.
pub fn file_descriptor_ident(path: &str) -> String {
    format!("File_{}", sanitize_path(path))
}

/// The (unexported) prefix shared by a file's reflection machinery
/// identifiers: raw descriptor const, message type table, and init function.
pub fn file_var_prefix(path: &str) -> String {
    format!("file_{}", sanitize_path(path))
}
