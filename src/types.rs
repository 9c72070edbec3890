//! Mapping from schema field kinds to the Rust types the generated code
//! stores and returns. Storage types are spelled with fully qualified paths
//! so the output never depends on the importing module's `use` items.

use prost_types::field_descriptor_proto::Type;

use crate::model::{FieldModel, TypeMap};

/// The Rust spelling of a scalar field kind. Panics on message, group, and
/// enum kinds, which resolve through the type map instead.
pub fn scalar_type(kind: Type) -> &'static str {
    match kind {
        Type::Double => "f64",
        Type::Float => "f32",
        Type::Int64 | Type::Sfixed64 | Type::Sint64 => "i64",
        Type::Uint64 | Type::Fixed64 => "u64",
        Type::Int32 | Type::Sfixed32 | Type::Sint32 => "i32",
        Type::Uint32 | Type::Fixed32 => "u32",
        Type::Bool => "bool",
        Type::String => "::std::string::String",
        Type::Bytes => "::std::vec::Vec<u8>",
        Type::Message | Type::Group | Type::Enum => {
            panic!("{:?} is not a scalar kind", kind)
        }
    }
}

/// The element type of a field, before any repetition or presence wrapper.
pub fn base_type(field: &FieldModel, type_map: &TypeMap, package: &str) -> String {
    match field.kind {
        Type::Message | Type::Group | Type::Enum => {
            type_map.resolve(&field.type_name, package)
        }
        _ => scalar_type(field.kind).to_string(),
    }
}

/// The full storage type of a struct field: maps and repeated fields become
/// collections, presence-tracked fields become options, and singular message
/// fields are additionally boxed so recursive messages have finite size.
pub fn storage_type(field: &FieldModel, type_map: &TypeMap, package: &str) -> String {
    if let Some(entry) = &field.map_entry {
        let (key, value) = &**entry;
        return format!(
            "::std::collections::HashMap<{}, {}>",
            base_type(key, type_map, package),
            base_type(value, type_map, package),
        );
    }
    let base = base_type(field, type_map, package);
    if field.repeated {
        return format!("::std::vec::Vec<{}>", base);
    }
    match field.kind {
        Type::Message | Type::Group => {
            format!("::core::option::Option<::std::boxed::Box<{}>>", base)
        }
        // Byte sequences carry absence as emptiness, never as nullability.
        Type::Bytes => base,
        _ if field.has_presence => format!("::core::option::Option<{}>", base),
        _ => base,
    }
}

/// The payload type of a oneof sum-type variant. Message payloads are boxed
/// for the same recursion reason as struct fields.
pub fn variant_type(field: &FieldModel, type_map: &TypeMap, package: &str) -> String {
    let base = base_type(field, type_map, package);
    match field.kind {
        Type::Message | Type::Group => format!("::std::boxed::Box<{}>", base),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::field_descriptor_proto::Label;
    use prost_types::FieldDescriptorProto;

    fn model(desc: FieldDescriptorProto) -> FieldModel {
        // The schema compiler emits a synthetic oneof for every
        // proto3-optional field; mirror that here so indexes line up.
        let oneof_decl = if desc.proto3_optional() {
            vec![prost_types::OneofDescriptorProto {
                name: Some(format!("_{}", desc.name())),
                ..Default::default()
            }]
        } else {
            Vec::new()
        };
        let file = prost_types::FileDescriptorProto {
            name: Some("t.proto".to_string()),
            package: Some("t".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![prost_types::DescriptorProto {
                name: Some("M".to_string()),
                field: vec![desc],
                oneof_decl,
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut built = crate::model::FileModel::build(&file, &crate::Config::default());
        built.messages.remove(0).fields.remove(0)
    }

    #[test]
    fn test_scalar_storage() {
        let field = model(FieldDescriptorProto {
            name: Some("count".to_string()),
            number: Some(1),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Uint32 as i32),
            ..Default::default()
        });
        assert_eq!("u32", storage_type(&field, &TypeMap::default(), "t"));
    }

    #[test]
    fn test_presence_scalar_storage() {
        let field = model(FieldDescriptorProto {
            name: Some("count".to_string()),
            number: Some(1),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Uint32 as i32),
            proto3_optional: Some(true),
            oneof_index: Some(0),
            ..Default::default()
        });
        assert_eq!(
            "::core::option::Option<u32>",
            storage_type(&field, &TypeMap::default(), "t"),
        );
    }

    #[test]
    fn test_repeated_storage() {
        let field = model(FieldDescriptorProto {
            name: Some("names".to_string()),
            number: Some(1),
            label: Some(Label::Repeated as i32),
            r#type: Some(Type::String as i32),
            ..Default::default()
        });
        assert_eq!(
            "::std::vec::Vec<::std::string::String>",
            storage_type(&field, &TypeMap::default(), "t"),
        );
    }
}
