//! End-to-end generation tests over hand-built descriptors, asserting on the
//! shape of the emitted text.

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, OneofDescriptorProto,
};
use pretty_assertions::assert_eq;
use protogen_build::{ApiLevel, Config, Error, Generator};

fn field(name: &str, number: i32, kind: Type, label: Label) -> FieldDescriptorProto {
    let json_name: String = {
        let mut out = String::new();
        let mut upper = false;
        for c in name.chars() {
            if c == '_' {
                upper = true;
            } else if upper {
                out.extend(c.to_uppercase());
                upper = false;
            } else {
                out.push(c);
            }
        }
        out
    };
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(kind as i32),
        json_name: Some(json_name),
        ..Default::default()
    }
}

fn file(
    name: &str,
    package: &str,
    syntax: &str,
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        syntax: Some(syntax.to_string()),
        message_type: messages,
        ..Default::default()
    }
}

fn generate_one(config: Config, descriptor: FileDescriptorProto) -> String {
    let path = descriptor.name().to_string();
    let outputs = Generator::new(config, vec![descriptor])
        .generate(&[path.as_str()])
        .unwrap();
    assert!(outputs.errors.is_empty(), "{:?}", outputs.errors);
    assert_eq!(1, outputs.files.len());
    outputs.files.into_iter().next().unwrap().content
}

#[test]
fn presence_and_defaults() {
    let _ = env_logger::builder().is_test(true).try_init();

    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        field: vec![
            field("name", 1, Type::String, Label::Optional),
            {
                let mut count = field("count", 2, Type::Int32, Label::Optional);
                count.proto3_optional = Some(true);
                count.oneof_index = Some(0);
                count
            },
        ],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("_count".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let content = generate_one(
        Config::new(),
        file("widget.proto", "demo", "proto3", vec![message]),
    );

    // The plain string field stores by value; the optional int is nullable.
    assert!(content.contains("pub name: ::std::string::String,"));
    assert!(content.contains("pub count: ::core::option::Option<i32>,"));
    assert!(content.contains("pub fn name(&self) -> &str {"));
    assert!(content.contains("self.name.as_str()"));
    assert!(content.contains("pub fn count(&self) -> i32 {"));
    assert!(content.contains("self.count.unwrap_or(0)"));

    // Bookkeeping slots lead the struct, and reset re-attaches type info.
    assert!(content.contains("state: ::protogen_runtime::MessageState,"));
    assert!(content.contains("size_cache: ::protogen_runtime::SizeCache,"));
    assert!(content.contains("unknown_fields: ::protogen_runtime::UnknownFields,"));
    assert!(content.contains("pub fn reset(&mut self) {"));
    assert!(content.contains("&file_widget_proto_msg_types[0]"));

    // Wire metadata survives into the field attribute, quote-escaped.
    assert!(content.contains(
        "#[field_meta(\"wire:\\x22bytes,1,opt,name=name,proto3\\x22 json:\\x22name,omitempty\\x22\")]"
    ));

    // Registration plumbing.
    assert!(content.contains("const file_widget_proto_raw_desc: &[u8] = b\""));
    assert!(content.contains("pub static File_widget_proto:"));
    assert!(content.contains("pub fn file_widget_proto_init() {"));
    assert!(content.contains("::protogen_runtime::enforce_version("));
}

#[test]
fn duplicate_enum_tags() {
    let descriptor = FileDescriptorProto {
        enum_type: vec![EnumDescriptorProto {
            name: Some("Level".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("ALPHA".to_string()),
                    number: Some(1),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("ALPHA_ALIAS".to_string()),
                    number: Some(1),
                    ..Default::default()
                },
            ],
            options: Some(prost_types::EnumOptions {
                allow_alias: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }],
        ..file("level.proto", "demo", "proto3", vec![])
    };
    let content = generate_one(Config::new(), descriptor);

    assert!(content.contains("pub struct Level(pub i32);"));
    assert!(content.contains("pub const Level_ALPHA: Level = Level(1);"));
    assert!(content.contains("pub const Level_ALPHA_ALIAS: Level = Level(1);"));

    // Number-to-name keeps the first name; the duplicate stays as a comment.
    let name_table = content
        .split("pub static Level_name:")
        .nth(1)
        .and_then(|rest| rest.split("];").next())
        .unwrap();
    assert!(name_table.contains("(1, \"ALPHA\"),"));
    assert!(name_table.contains("// Duplicate value: (1, \"ALPHA_ALIAS\")"));
    assert!(!name_table.contains("(1, \"ALPHA_ALIAS\"),"));

    // Name-to-number keeps both spellings.
    let value_table = content
        .split("pub static Level_value:")
        .nth(1)
        .and_then(|rest| rest.split("];").next())
        .unwrap();
    assert!(value_table.contains("(\"ALPHA\", 1),"));
    assert!(value_table.contains("(\"ALPHA_ALIAS\", 1),"));
}

#[test]
fn oneof_accessors() {
    let message = DescriptorProto {
        name: Some("Choice".to_string()),
        field: vec![
            {
                let mut f = field("first", 1, Type::String, Label::Optional);
                f.oneof_index = Some(0);
                f
            },
            {
                let mut f = field("second", 2, Type::String, Label::Optional);
                f.oneof_index = Some(0);
                f
            },
        ],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("kind".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let content = generate_one(
        Config::new(),
        file("choice.proto", "demo", "proto3", vec![message]),
    );

    // The two members collapse to one slot; the sum type carries both cases.
    assert!(content.contains("pub kind: ::core::option::Option<Choice_Kind>,"));
    assert!(content.contains("pub enum Choice_Kind {"));
    assert!(content.contains("First(::std::string::String),"));
    assert!(content.contains("Second(::std::string::String),"));

    // The slot getter exposes the active case; member getters match on it.
    assert!(content
        .contains("pub fn kind(&self) -> ::core::option::Option<&Choice_Kind> {"));
    assert!(content.contains(
        "::core::option::Option::Some(Choice_Kind::First(v)) => v.as_str(),"
    ));
    assert!(content.contains("_ => \"\","));

    // Each member appears in the struct exactly once, via the oneof slot.
    assert!(!content.contains("pub first:"));
    assert!(!content.contains("pub second:"));
}

#[test]
fn public_import_forwarding() {
    let dep_message = DescriptorProto {
        name: Some("Gadget".to_string()),
        ..Default::default()
    };
    let dep = file("dep.proto", "other", "proto3", vec![dep_message]);
    let main = FileDescriptorProto {
        dependency: vec!["dep.proto".to_string()],
        public_dependency: vec![0],
        ..file("main.proto", "demo", "proto3", vec![])
    };

    let outputs = Generator::new(Config::new(), vec![dep, main])
        .generate(&["main.proto"])
        .unwrap();
    assert!(outputs.errors.is_empty(), "{:?}", outputs.errors);

    // Only the requested file is an output; the import is generated for
    // forwarding only.
    assert_eq!(1, outputs.files.len());
    assert_eq!("main.rs", outputs.files[0].name);
    let content = &outputs.files[0].content;

    assert!(content.contains("// Symbols defined in public import of dep.proto."));
    assert!(content.contains("pub type Gadget = super::other::Gadget;"));
    // The imported file's descriptor singleton is never forwarded.
    assert!(!content.contains("File_dep_proto;"));
}

#[test]
fn hybrid_emits_two_variants() {
    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        field: vec![{
            let mut count = field("count", 1, Type::Uint32, Label::Optional);
            count.proto3_optional = Some(true);
            count.oneof_index = Some(0);
            count
        }],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("_count".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut config = Config::new();
    config.default_api_level(ApiLevel::Hybrid);
    let outputs = Generator::new(
        config,
        vec![file("widget.proto", "demo", "proto3", vec![message])],
    )
    .generate(&["widget.proto"])
    .unwrap();
    assert!(outputs.errors.is_empty(), "{:?}", outputs.errors);

    assert_eq!(2, outputs.files.len());
    assert_eq!("widget.rs", outputs.files[0].name);
    assert_eq!("widget_protoopaque.rs", outputs.files[1].name);

    let open = &outputs.files[0].content;
    assert!(open.contains("#![cfg(not(proto_opaque))]"));
    assert!(open.contains("pub count: ::core::option::Option<u32>,"));
    assert!(!open.contains("pub fn set_count"));

    let opaque = &outputs.files[1].content;
    assert!(opaque.contains("#![cfg(proto_opaque)]"));
    assert!(opaque.contains("    count: ::core::option::Option<u32>,"));
    assert!(!opaque.contains("pub count:"));
    assert!(opaque.contains("pub fn set_count(&mut self, v: u32) {"));
    assert!(opaque.contains("pub fn has_count(&self) -> bool {"));
    assert!(opaque.contains("pub fn clear_count(&mut self) {"));
    // Both variants still expose the getter.
    assert!(opaque.contains("pub fn count(&self) -> u32 {"));
}

#[test]
fn non_finite_defaults_never_render_as_literals() {
    let message = DescriptorProto {
        name: Some("Bounds".to_string()),
        field: vec![
            {
                let mut f = field("ratio", 1, Type::Double, Label::Optional);
                f.default_value = Some("nan".to_string());
                f
            },
            {
                let mut f = field("upper", 2, Type::Float, Label::Optional);
                f.default_value = Some("inf".to_string());
                f
            },
            {
                let mut f = field("lower", 3, Type::Double, Label::Optional);
                f.default_value = Some("-inf".to_string());
                f
            },
        ],
        ..Default::default()
    };
    let content = generate_one(
        Config::new(),
        file("bounds.proto", "demo", "proto2", vec![message]),
    );

    assert!(content.contains(
        "pub static Default_Bounds_Ratio: f64 = ::protogen_runtime::math::nan_f64();"
    ));
    assert!(content.contains(
        "pub static Default_Bounds_Upper: f32 = ::protogen_runtime::math::inf_f32(1);"
    ));
    assert!(content.contains(
        "pub static Default_Bounds_Lower: f64 = ::protogen_runtime::math::inf_f64(-1);"
    ));
    assert!(!content.contains("NaN"));
    assert!(content.contains("self.ratio.unwrap_or(Default_Bounds_Ratio)"));
}

#[test]
fn extensions_table_and_handles() {
    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        extension_range: vec![prost_types::descriptor_proto::ExtensionRange {
            start: Some(100),
            end: Some(200),
            ..Default::default()
        }],
        ..Default::default()
    };
    let descriptor = FileDescriptorProto {
        extension: vec![{
            let mut ext = field("serial", 100, Type::Int64, Label::Optional);
            ext.extendee = Some(".demo.Widget".to_string());
            ext
        }],
        ..file("ext.proto", "demo", "proto2", vec![message])
    };
    let content = generate_one(Config::new(), descriptor);

    // Extension-range messages grow the extension storage slot.
    assert!(content.contains("extension_fields: ::protogen_runtime::ExtensionFields,"));

    assert!(content
        .contains("const file_ext_proto_extensions: [::protogen_runtime::ExtensionInfo; 1] = ["));
    assert!(content.contains("extended_type: \"demo.Widget\","));
    assert!(content.contains("number: 100,"));
    assert!(content.contains("name: \"demo.serial\","));

    assert!(content.contains("// Extension fields of demo.Widget."));
    assert!(content.contains("// optional int64 serial = 100;"));
    assert!(content.contains(
        "pub const E_Serial: &::protogen_runtime::ExtensionInfo = &file_ext_proto_extensions[0];"
    ));
}

#[test]
fn raw_descriptor_policy() {
    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        ..Default::default()
    };
    let mut config = Config::new();
    config.raw_descriptors(".demo.Widget");
    let content = generate_one(
        config,
        file("widget.proto", "demo", "proto3", vec![message]),
    );

    assert!(content.contains("pub fn descriptor() -> (::std::vec::Vec<u8>, &'static [i32]) {"));
    assert!(content.contains("(file_widget_proto_raw_desc_gzip(), &[0])"));
    assert!(content.contains("fn file_widget_proto_raw_desc_gzip() -> ::std::vec::Vec<u8> {"));
}

#[test]
fn strip_for_diff_suppresses_volatile_sections() {
    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        field: vec![field("name", 1, Type::String, Label::Optional)],
        ..Default::default()
    };
    let mut config = Config::new();
    config.strip_for_diff(true);
    let content = generate_one(
        config,
        file("widget.proto", "demo", "proto3", vec![message]),
    );

    assert!(!content.contains("Code generated"));
    assert!(!content.contains("_raw_desc"));
    assert!(!content.contains("file_widget_proto_init"));
    // The declarations themselves survive.
    assert!(content.contains("pub struct Widget {"));
}

#[test]
fn field_named_after_fixed_method_is_renamed() {
    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        field: vec![field("reset", 1, Type::String, Label::Optional)],
        ..Default::default()
    };
    let content = generate_one(
        Config::new(),
        file("widget.proto", "demo", "proto3", vec![message]),
    );

    // The fixed method keeps its name; the schema field steps aside, in both
    // the struct and its getter.
    assert!(content.contains("pub fn reset(&mut self) {"));
    assert!(content.contains("pub reset_: ::std::string::String,"));
    assert!(content.contains("pub fn reset_(&self) -> &str {"));
    assert_eq!(1, content.matches("pub fn reset(").count());
}

#[test]
fn opaque_mutator_collision_is_renamed() {
    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        field: vec![
            field("set_count", 1, Type::String, Label::Optional),
            field("count", 2, Type::Uint32, Label::Optional),
        ],
        ..Default::default()
    };
    let mut config = Config::new();
    config.default_api_level(ApiLevel::Opaque);
    let content = generate_one(
        config,
        file("widget.proto", "demo", "proto3", vec![message]),
    );

    // The first field's own accessor surface owns `set_count`; the second
    // field is renamed so its mutator stays unique.
    assert!(content.contains("pub fn set_set_count(&mut self, v: ::std::string::String) {"));
    assert!(content.contains("pub fn count_(&self) -> u32 {"));
    assert!(content.contains("pub fn set_count_(&mut self, v: u32) {"));
    assert_eq!(1, content.matches("pub fn set_count(").count());
}

#[test]
fn field_tracking_policy() {
    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        field: vec![
            field("name", 1, Type::String, Label::Optional),
            {
                let mut f = field("first", 2, Type::String, Label::Optional);
                f.oneof_index = Some(0);
                f
            },
        ],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("kind".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut config = Config::new();
    config.field_tracking(".demo.Widget");
    let content = generate_one(
        config,
        file("widget.proto", "demo", "proto3", vec![message]),
    );

    // The tracking marker rides last on the field metadata, and the oneof
    // slot and its variants carry it too.
    assert!(content.contains(
        "#[field_meta(\"wire:\\x22bytes,1,opt,name=name,proto3\\x22 json:\\x22name,omitempty\\x22 track:\\x22on\\x22\")]"
    ));
    assert!(content.contains("#[field_meta(\"track:\\x22on\\x22\")]"));
    assert!(content.contains(
        "#[field_meta(\"wire:\\x22bytes,2,opt,name=first,proto3\\x22 track:\\x22on\\x22\")]"
    ));

    // Untracked messages are unchanged.
    let message = DescriptorProto {
        name: Some("Widget".to_string()),
        field: vec![field("name", 1, Type::String, Label::Optional)],
        ..Default::default()
    };
    let content = generate_one(
        Config::new(),
        file("widget.proto", "demo", "proto3", vec![message]),
    );
    assert!(!content.contains("track:"));
}

#[test]
fn missing_file_is_collaborator_error() {
    let outputs = Generator::new(Config::new(), vec![])
        .generate(&["nope.proto"])
        .unwrap();
    assert!(outputs.files.is_empty());
    assert_eq!(1, outputs.errors.len());
    match &outputs.errors[0] {
        Error::MissingFile(path) => assert_eq!("nope.proto", path),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn legacy_json_policy() {
    let descriptor = FileDescriptorProto {
        enum_type: vec![EnumDescriptorProto {
            name: Some("Level".to_string()),
            value: vec![EnumValueDescriptorProto {
                name: Some("ALPHA".to_string()),
                number: Some(0),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..file("level.proto", "demo", "proto3", vec![])
    };
    let mut config = Config::new();
    config.legacy_json(".demo.Level");
    let content = generate_one(config, descriptor);

    assert!(content.contains("pub fn unmarshal_json("));
    assert!(content
        .contains("::protogen_runtime::reflect::enum_from_json(Level_value, \"demo.Level\", b)"));
}
