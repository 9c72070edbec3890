//! Field metadata rendering: the wire tag and JSON naming strings embedded in
//! the `#[field_meta("...")]` attribute of every generated struct field, which
//! the runtime parses to drive encoding and reflection.

use prost_types::field_descriptor_proto::Type;

use crate::model::{FieldModel, Syntax};

/// The wire encoding kind of a field, as spelled inside the wire tag.
pub fn wire_kind(kind: Type) -> &'static str {
    match kind {
        Type::Int32
        | Type::Int64
        | Type::Uint32
        | Type::Uint64
        | Type::Bool
        | Type::Enum => "varint",
        Type::Sint32 => "zigzag32",
        Type::Sint64 => "zigzag64",
        Type::Fixed32 | Type::Sfixed32 | Type::Float => "fixed32",
        Type::Fixed64 | Type::Sfixed64 | Type::Double => "fixed64",
        Type::String | Type::Bytes | Type::Message => "bytes",
        Type::Group => "group",
    }
}

fn is_packed(field: &FieldModel, syntax: Syntax) -> bool {
    if !field.repeated {
        return false;
    }
    let packable = !matches!(
        field.kind,
        Type::String | Type::Bytes | Type::Message | Type::Group
    );
    if !packable {
        return false;
    }
    match field.packed {
        Some(explicit) => explicit,
        // Packable repeated fields are packed by default under proto3.
        None => syntax == Syntax::Proto3,
    }
}

/// Renders the wire tag of a field: encoding kind, number, cardinality, and
/// trailing annotations in fixed order.
pub fn field_tag(field: &FieldModel, syntax: Syntax) -> String {
    let cardinality = match (field.repeated, syntax) {
        (true, _) => "rep",
        // Required fields only exist under proto2; everything singular there
        // that is not explicitly required is opt, which protoc has already
        // folded into the label.
        (false, _) if field.required => "req",
        (false, _) => "opt",
    };
    let mut tag = format!(
        "{},{},{}",
        wire_kind(field.kind),
        field.number,
        cardinality
    );
    if is_packed(field, syntax) {
        tag.push_str(",packed");
    }
    tag.push_str(",name=");
    tag.push_str(&field.name);
    if let Some(json_name) = &field.json_name {
        if *json_name != json_camel_case(&field.name) {
            tag.push_str(",json=");
            tag.push_str(json_name);
        }
    }
    if field.kind == Type::Enum {
        tag.push_str(",enum=");
        tag.push_str(field.type_name.trim_start_matches('.'));
    }
    if syntax == Syntax::Proto3 {
        tag.push_str(",proto3");
    }
    if let Some(default) = &field.default_value {
        tag.push_str(",def=");
        tag.push_str(default);
    }
    tag
}

/// The JSON naming tag: declared name plus the omit-if-default marker, unless
/// a sentinel JSON name overrides it. `-` suppresses the field from JSON
/// output entirely, and `MUST` forces emission even at the default value.
pub fn json_tag(field: &FieldModel) -> String {
    match field.json_name.as_deref() {
        Some("-") => "-".to_string(),
        Some("MUST") => field.name.clone(),
        _ => format!("{},omitempty", field.name),
    }
}

/// The ordered metadata pairs of a field. Map fields additionally carry the
/// key and value encodings as sub-tags; fields of tracked messages carry a
/// trailing tracking marker.
pub fn meta_pairs(
    field: &FieldModel,
    syntax: Syntax,
    tracked: bool,
) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("wire", field_tag(field, syntax))];
    if let Some(entry) = &field.map_entry {
        let (key, value) = &**entry;
        pairs.push(("wire_key", field_tag(key, syntax)));
        pairs.push(("wire_val", field_tag(value, syntax)));
    }
    pairs.push(("json", json_tag(field)));
    if tracked {
        pairs.push(track_pair());
    }
    pairs
}

/// The field-tracking marker pair, appended last on tracked declarations.
pub fn track_pair() -> (&'static str, String) {
    ("track", "on".to_string())
}

/// Renders metadata pairs into the single string embedded in a
/// `#[field_meta("...")]` attribute. Each value is quoted, and the result is
/// escaped so it survives embedding in the surrounding string literal: every
/// backslash doubles and every quote becomes its `\x22` hex escape.
pub fn render_meta(pairs: &[(&'static str, String)]) -> String {
    let raw = pairs
        .iter()
        .map(|(key, value)| format!("{}:\"{}\"", key, value))
        .collect::<Vec<_>>()
        .join(" ");

    let mut escaped = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\x22"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// The automatic JSON name of a field: underscores dropped, the following
/// letter uppercased. Matches the derivation the schema compiler applies when
/// no explicit JSON name is given.
pub fn json_camel_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut capitalize = false;
    for c in name.chars() {
        if c == '_' {
            capitalize = true;
        } else if capitalize {
            result.extend(c.to_uppercase());
            capitalize = false;
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::field_descriptor_proto::Label;
    use prost_types::FieldDescriptorProto;

    fn build(desc: FieldDescriptorProto, syntax: &str) -> FieldModel {
        let file = prost_types::FileDescriptorProto {
            name: Some("t.proto".to_string()),
            package: Some("t".to_string()),
            syntax: Some(syntax.to_string()),
            message_type: vec![prost_types::DescriptorProto {
                name: Some("M".to_string()),
                field: vec![desc],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut built = crate::model::FileModel::build(&file, &crate::Config::default());
        built.messages.remove(0).fields.remove(0)
    }

    #[test]
    fn test_wire_tag_proto3_scalar() {
        let field = build(
            FieldDescriptorProto {
                name: Some("shard_id".to_string()),
                number: Some(3),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Uint32 as i32),
                json_name: Some("shardId".to_string()),
                ..Default::default()
            },
            "proto3",
        );
        assert_eq!(
            "varint,3,opt,name=shard_id,proto3",
            field_tag(&field, Syntax::Proto3),
        );
    }

    #[test]
    fn test_wire_tag_custom_json_name() {
        let field = build(
            FieldDescriptorProto {
                name: Some("shard_id".to_string()),
                number: Some(3),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Uint32 as i32),
                json_name: Some("shard".to_string()),
                ..Default::default()
            },
            "proto3",
        );
        assert_eq!(
            "varint,3,opt,name=shard_id,json=shard,proto3",
            field_tag(&field, Syntax::Proto3),
        );
    }

    #[test]
    fn test_wire_tag_packed_repeated() {
        let field = build(
            FieldDescriptorProto {
                name: Some("values".to_string()),
                number: Some(2),
                label: Some(Label::Repeated as i32),
                r#type: Some(Type::Sint64 as i32),
                json_name: Some("values".to_string()),
                ..Default::default()
            },
            "proto3",
        );
        assert_eq!(
            "zigzag64,2,rep,packed,name=values,proto3",
            field_tag(&field, Syntax::Proto3),
        );
    }

    #[test]
    fn test_wire_tag_proto2_default() {
        let field = build(
            FieldDescriptorProto {
                name: Some("ratio".to_string()),
                number: Some(7),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Double as i32),
                default_value: Some("0.5".to_string()),
                json_name: Some("ratio".to_string()),
                ..Default::default()
            },
            "proto2",
        );
        assert_eq!(
            "fixed64,7,opt,name=ratio,def=0.5",
            field_tag(&field, Syntax::Proto2),
        );
    }

    #[test]
    fn test_json_tag_sentinels() {
        let mut field = build(
            FieldDescriptorProto {
                name: Some("token".to_string()),
                number: Some(1),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::String as i32),
                json_name: Some("token".to_string()),
                ..Default::default()
            },
            "proto3",
        );
        assert_eq!("token,omitempty", json_tag(&field));
        field.json_name = Some("-".to_string());
        assert_eq!("-", json_tag(&field));
        field.json_name = Some("MUST".to_string());
        assert_eq!("token", json_tag(&field));
    }

    #[test]
    fn test_render_meta_escapes_quotes() {
        let pairs = vec![
            ("wire", "varint,1,opt,name=n,proto3".to_string()),
            ("json", "n,omitempty".to_string()),
        ];
        assert_eq!(
            "wire:\\x22varint,1,opt,name=n,proto3\\x22 json:\\x22n,omitempty\\x22",
            render_meta(&pairs),
        );
    }

    #[test]
    fn test_meta_pairs_tracking_marker() {
        let field = build(
            FieldDescriptorProto {
                name: Some("count".to_string()),
                number: Some(1),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Uint32 as i32),
                json_name: Some("count".to_string()),
                ..Default::default()
            },
            "proto3",
        );
        let plain = meta_pairs(&field, Syntax::Proto3, false);
        assert_eq!("json", plain.last().unwrap().0);

        let tracked = meta_pairs(&field, Syntax::Proto3, true);
        assert_eq!(("track", "on".to_string()), *tracked.last().unwrap());
    }

    #[test]
    fn test_json_camel_case() {
        assert_eq!("shardId", json_camel_case("shard_id"));
        assert_eq!("a", json_camel_case("a"));
        assert_eq!("fooBarBaz", json_camel_case("foo_bar_baz"));
    }
}
