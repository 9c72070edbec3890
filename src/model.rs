//! Derived, read-only projections of the descriptor tree.
//!
//! A [`FileModel`] and its children are built once per (file, variant)
//! generation pass and discarded after the text is produced. The only
//! mutation the models ever see is the explicit API-shape promotion pass
//! ([`FileModel::promote_to_opaque`]) run to completion between the two
//! variants of a hybrid file.

use std::collections::{HashMap, HashSet};

use itertools::{Either, Itertools};
use log::debug;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
};

use crate::ident::{
    file_descriptor_ident, file_var_prefix, strip_enum_value_prefix, to_snake, to_upper_camel,
};
use crate::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Syntax {
    Proto2,
    Proto3,
}

/// The API shape emitted for a message: open structs with public fields,
/// opaque structs accessed through methods only, or hybrid, which produces
/// both as two output variants of the same file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApiLevel {
    #[default]
    Open,
    Hybrid,
    Opaque,
}

#[derive(Debug)]
pub struct FileModel {
    pub path: String,
    /// Package name without the leading dot; possibly empty.
    pub package: String,
    pub syntax: Syntax,
    pub api_level: ApiLevel,
    pub deprecated: bool,
    /// Exported descriptor singleton identifier, e.g. `File_foo_proto`.
    pub descriptor_ident: String,
    /// Prefix for the file's unexported reflection identifiers.
    pub var_prefix: String,
    pub imports: Vec<ImportModel>,
    pub enums: Vec<EnumModel>,
    /// All messages, flattened in nesting order (parents before children).
    /// Map entry messages are consumed into map fields and do not appear.
    pub messages: Vec<MessageModel>,
    pub extensions: Vec<ExtensionModel>,
    /// Source locations, sorted by path for binary search.
    locations: Vec<Location>,
}

#[derive(Debug)]
pub struct ImportModel {
    pub path: String,
    pub public: bool,
}

#[derive(Debug)]
pub struct MessageModel {
    pub fq_name: String,
    /// Flattened Rust type name, e.g. `Outer_Inner`.
    pub rust_name: String,
    pub api_level: ApiLevel,
    pub deprecated: bool,
    pub has_extension_ranges: bool,
    /// Whether the field-tracking policy matched; tracked messages carry an
    /// extra metadata pair on every field, oneof slot, and oneof variant.
    pub tracked: bool,
    /// Schema fields in declaration order, including oneof members.
    pub fields: Vec<FieldModel>,
    pub oneofs: Vec<OneofModel>,
    pub location_path: Vec<i32>,
}

#[derive(Debug)]
pub struct FieldModel {
    pub name: String,
    /// Unique struct field identifier; deduplicated against the fixed
    /// bookkeeping field names.
    pub rust_name: String,
    pub number: i32,
    pub kind: Type,
    /// Fully qualified type name (leading dot) for message, group, and enum
    /// kinds; empty otherwise.
    pub type_name: String,
    pub repeated: bool,
    pub required: bool,
    /// Key and value sub-fields when this is a map field. They are ordinary
    /// `FieldModel`s consulted recursively for type and tag generation.
    pub map_entry: Option<Box<(FieldModel, FieldModel)>>,
    pub has_presence: bool,
    pub proto3_optional: bool,
    /// Index into the owning message's oneof list, synthetic oneofs included.
    pub oneof_index: Option<usize>,
    pub default_value: Option<String>,
    pub json_name: Option<String>,
    pub packed: Option<bool>,
    pub deprecated: bool,
    pub location_path: Vec<i32>,
}

impl FieldModel {
    pub fn is_map(&self) -> bool {
        self.map_entry.is_some()
    }

    /// The index of the non-synthetic oneof this field belongs to, if any.
    pub fn real_oneof_index(&self, msg: &MessageModel) -> Option<usize> {
        self.oneof_index.filter(|&idx| !msg.oneofs[idx].synthetic)
    }
}

#[derive(Debug)]
pub struct OneofModel {
    pub name: String,
    /// Struct field identifier for the collapsed oneof slot.
    pub rust_name: String,
    /// Flattened sum type name, e.g. `Foo_Kind`.
    pub type_name: String,
    /// Synthetic oneofs exist only to mark a proto3 field optional; they are
    /// excluded from sum-type emission but still consulted for presence.
    pub synthetic: bool,
    /// Indices into the owning message's field list, in declaration order.
    pub fields: Vec<usize>,
    pub location_path: Vec<i32>,
}

#[derive(Debug)]
pub struct EnumModel {
    pub fq_name: String,
    pub rust_name: String,
    pub deprecated: bool,
    pub legacy_json: bool,
    pub values: Vec<EnumValueModel>,
    pub location_path: Vec<i32>,
}

#[derive(Debug)]
pub struct EnumValueModel {
    pub name: String,
    pub number: i32,
    /// Primary constant identifier, prefix-stripped when the policy asks.
    pub const_ident: String,
    /// The unstripped spelling, kept as an aliasing constant when it differs
    /// from the primary identifier.
    pub legacy_alias: Option<String>,
    pub deprecated: bool,
    pub location_path: Vec<i32>,
}

#[derive(Debug)]
pub struct ExtensionModel {
    /// Fully qualified name of the extended message, with leading dot.
    pub extendee: String,
    pub field: FieldModel,
    /// Full schema name of the extension field itself.
    pub full_name: String,
    /// Exported handle identifier, e.g. `E_Serial`.
    pub handle_ident: String,
    pub location_path: Vec<i32>,
}

/// Returns the nested-type index path of a declaration: every second element
/// of its location path, as used by the deprecated raw-descriptor accessors.
pub fn desc_indexes(location_path: &[i32]) -> Vec<i32> {
    location_path.iter().skip(1).step_by(2).copied().collect()
}

impl FileModel {
    pub fn build(file: &FileDescriptorProto, config: &Config) -> FileModel {
        let package = file.package().to_string();
        let syntax = match file.syntax.as_deref() {
            None | Some("proto2") => Syntax::Proto2,
            Some("proto3") => Syntax::Proto3,
            Some(s) => panic!("unknown syntax: {}", s),
        };

        let mut locations = file
            .source_code_info
            .as_ref()
            .map(|info| info.location.clone())
            .unwrap_or_default();
        // Declarations sit at even-length paths; length one is kept for the
        // file-level comment carriers (package and syntax statements).
        locations.retain(|location| {
            let len = location.path.len();
            len == 1 || (len > 0 && len % 2 == 0)
        });
        locations.sort_by(|a, b| a.path.cmp(&b.path));

        let deprecated = file
            .options
            .as_ref()
            .map_or(false, |options| options.deprecated());

        let mut model = FileModel {
            path: file.name().to_string(),
            descriptor_ident: file_descriptor_ident(file.name()),
            var_prefix: file_var_prefix(file.name()),
            package,
            syntax,
            api_level: config.default_api_level,
            deprecated,
            imports: Vec::new(),
            enums: Vec::new(),
            messages: Vec::new(),
            extensions: Vec::new(),
            locations,
        };

        debug!("file: {:?}, package: {:?}", model.path, model.package);

        let public: HashSet<i32> = file.public_dependency.iter().copied().collect();
        for (idx, dep) in file.dependency.iter().enumerate() {
            model.imports.push(ImportModel {
                path: dep.clone(),
                public: public.contains(&(idx as i32)),
            });
        }

        let fq_prefix = if model.package.is_empty() {
            String::new()
        } else {
            format!(".{}", model.package)
        };
        for (idx, message) in file.message_type.iter().enumerate() {
            model.build_message(config, message, &fq_prefix, "", vec![4, idx as i32]);
        }
        for (idx, desc) in file.enum_type.iter().enumerate() {
            let enum_model = build_enum(config, desc, &fq_prefix, "", vec![5, idx as i32]);
            model.enums.push(enum_model);
        }
        for (idx, ext) in file.extension.iter().enumerate() {
            let ext_model = model.build_extension(ext, "", vec![7, idx as i32]);
            model.extensions.push(ext_model);
        }

        if model.api_level != ApiLevel::Hybrid
            && model.messages.iter().any(|m| m.api_level == ApiLevel::Hybrid)
        {
            model.api_level = ApiLevel::Hybrid;
        }

        model
    }

    fn build_message(
        &mut self,
        config: &Config,
        message: &DescriptorProto,
        fq_prefix: &str,
        rust_prefix: &str,
        location_path: Vec<i32>,
    ) {
        let fq_name = format!("{}.{}", fq_prefix, message.name());
        let rust_name = if rust_prefix.is_empty() {
            to_upper_camel(message.name())
        } else {
            format!("{}_{}", rust_prefix, to_upper_camel(message.name()))
        };
        debug!("  message: {:?}", fq_name);

        // Split the nested message types into a vector of normal nested
        // message types, and a map of the map field entry types. The nesting
        // index is preserved so that comments can be retrieved.
        type NestedTypes<'a> = Vec<(&'a DescriptorProto, usize)>;
        type MapTypes<'a> = HashMap<String, (&'a FieldDescriptorProto, &'a FieldDescriptorProto)>;
        let (nested_types, map_types): (NestedTypes, MapTypes) = message
            .nested_type
            .iter()
            .enumerate()
            .partition_map(|(idx, nested_type)| {
                if nested_type
                    .options
                    .as_ref()
                    .and_then(|options| options.map_entry)
                    .unwrap_or(false)
                {
                    let key = &nested_type.field[0];
                    let value = &nested_type.field[1];
                    assert_eq!("key", key.name());
                    assert_eq!("value", value.name());

                    let name = format!("{}.{}", fq_name, nested_type.name());
                    Either::Right((name, (key, value)))
                } else {
                    Either::Left((nested_type, idx))
                }
            });

        let has_extension_ranges = !message.extension_range.is_empty();

        let mut fields = Vec::with_capacity(message.field.len());
        for (idx, field) in message.field.iter().enumerate() {
            let mut field_path = location_path.clone();
            field_path.extend([2, idx as i32]);
            fields.push(build_field(field, self.syntax, &map_types, field_path));
        }

        let mut oneofs = Vec::with_capacity(message.oneof_decl.len());
        for (idx, oneof) in message.oneof_decl.iter().enumerate() {
            let members: Vec<usize> = fields
                .iter()
                .positions(|f| f.oneof_index == Some(idx))
                .collect();
            let synthetic =
                members.len() == 1 && fields[members[0]].proto3_optional;
            let mut oneof_path = location_path.clone();
            oneof_path.extend([8, idx as i32]);
            oneofs.push(OneofModel {
                name: oneof.name().to_string(),
                rust_name: to_snake(oneof.name()),
                type_name: format!("{}_{}", rust_name, to_upper_camel(oneof.name())),
                synthetic,
                fields: members,
                location_path: oneof_path,
            });
        }

        let api_level = config.api_level_for(&fq_name);

        // Deduplicate emitted field, oneof, and accessor names against the
        // fixed bookkeeping slots and the fixed method names, which share
        // the accessor namespace. Opaque-capable shapes additionally claim
        // the mutator spellings of every accessor.
        let mutators = api_level != ApiLevel::Open;
        let mut registry = NameRegistry::default();
        registry.reserve("state");
        registry.reserve("size_cache");
        registry.reserve("unknown_fields");
        if has_extension_ranges {
            registry.reserve("extension_fields");
        }
        registry.reserve("reset");
        registry.reserve("msg_reflect");
        registry.reserve("descriptor");
        let mut claimed_oneofs = HashSet::new();
        for idx in 0..fields.len() {
            if let Some(o) = fields[idx].oneof_index {
                if !oneofs[o].synthetic && claimed_oneofs.insert(o) {
                    oneofs[o].rust_name = registry.claim(&oneofs[o].rust_name, mutators);
                }
            }
            fields[idx].rust_name = registry.claim(&fields[idx].rust_name, mutators);
        }
        self.messages.push(MessageModel {
            fq_name: fq_name.clone(),
            rust_name: rust_name.clone(),
            api_level,
            deprecated: message
                .options
                .as_ref()
                .map_or(false, |options| options.deprecated()),
            has_extension_ranges,
            tracked: config.field_tracking_for(&fq_name),
            fields,
            oneofs,
            location_path: location_path.clone(),
        });

        for (nested, idx) in nested_types {
            let mut nested_path = location_path.clone();
            nested_path.extend([3, idx as i32]);
            self.build_message(config, nested, &fq_name, &rust_name, nested_path);
        }
        for (idx, nested_enum) in message.enum_type.iter().enumerate() {
            let mut enum_path = location_path.clone();
            enum_path.extend([4, idx as i32]);
            let enum_model = build_enum(config, nested_enum, &fq_name, &rust_name, enum_path);
            self.enums.push(enum_model);
        }
        for (idx, ext) in message.extension.iter().enumerate() {
            let mut ext_path = location_path.clone();
            ext_path.extend([6, idx as i32]);
            let ext_model = self.build_extension(ext, &rust_name, ext_path);
            self.extensions.push(ext_model);
        }
    }

    fn build_extension(
        &self,
        ext: &FieldDescriptorProto,
        rust_prefix: &str,
        location_path: Vec<i32>,
    ) -> ExtensionModel {
        let field = build_field(ext, self.syntax, &HashMap::new(), location_path.clone());
        let handle_ident = if rust_prefix.is_empty() {
            format!("E_{}", to_upper_camel(ext.name()))
        } else {
            format!("E_{}_{}", rust_prefix, to_upper_camel(ext.name()))
        };
        let full_name = if self.package.is_empty() {
            ext.name().to_string()
        } else {
            format!("{}.{}", self.package, ext.name())
        };
        ExtensionModel {
            extendee: ext.extendee().to_string(),
            field,
            full_name,
            handle_ident,
            location_path,
        }
    }

    /// Looks up the comments attached to a declaration by location path.
    pub fn comments(&self, path: &[i32]) -> crate::ast::Comments {
        match self
            .locations
            .binary_search_by(|location| location.path[..].cmp(path))
        {
            Ok(idx) => crate::ast::Comments::from_location(&self.locations[idx]),
            Err(_) => crate::ast::Comments::default(),
        }
    }

    /// Flips the file and every message (nested ones included, via the
    /// flattened list) to the opaque API shape. Run to completion before the
    /// second variant of a hybrid file is emitted; the two passes never
    /// interleave.
    pub fn promote_to_opaque(&mut self) {
        self.api_level = ApiLevel::Opaque;
        for message in &mut self.messages {
            message.api_level = ApiLevel::Opaque;
        }
    }
}

fn build_field(
    field: &FieldDescriptorProto,
    syntax: Syntax,
    map_types: &HashMap<String, (&FieldDescriptorProto, &FieldDescriptorProto)>,
    location_path: Vec<i32>,
) -> FieldModel {
    let repeated = field.label() == Label::Repeated;
    let kind = field.r#type();
    let map_entry = field
        .type_name
        .as_ref()
        .and_then(|type_name| map_types.get(type_name))
        .map(|(key, value)| {
            Box::new((
                build_field(key, syntax, &HashMap::new(), Vec::new()),
                build_field(value, syntax, &HashMap::new(), Vec::new()),
            ))
        });

    let has_presence = if repeated {
        // A repeated field is never also presence-tracked: lists use
        // emptiness, not nullability, for absence.
        false
    } else {
        match kind {
            Type::Message | Type::Group => true,
            _ => match syntax {
                Syntax::Proto2 => true,
                Syntax::Proto3 => field.proto3_optional() || field.oneof_index.is_some(),
            },
        }
    };

    FieldModel {
        name: field.name().to_string(),
        rust_name: to_snake(field.name()),
        number: field.number(),
        kind,
        type_name: field.type_name().to_string(),
        repeated,
        required: field.label() == Label::Required,
        map_entry,
        has_presence,
        proto3_optional: field.proto3_optional(),
        oneof_index: field.oneof_index.map(|idx| idx as usize),
        default_value: field.default_value.clone(),
        json_name: field.json_name.clone(),
        packed: field.options.as_ref().and_then(|options| options.packed),
        deprecated: field
            .options
            .as_ref()
            .map_or(false, |options| options.deprecated()),
        location_path,
    }
}

fn build_enum(
    config: &Config,
    desc: &EnumDescriptorProto,
    fq_prefix: &str,
    rust_prefix: &str,
    location_path: Vec<i32>,
) -> EnumModel {
    let fq_name = format!("{}.{}", fq_prefix, desc.name());
    let rust_name = if rust_prefix.is_empty() {
        to_upper_camel(desc.name())
    } else {
        format!("{}_{}", rust_prefix, to_upper_camel(desc.name()))
    };
    debug!("  enum: {:?}", fq_name);

    let values = desc
        .value
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let full_ident = format!("{}_{}", rust_name, value.name());
            let primary = enum_value_ident(config, &rust_name, value.name());
            let legacy_alias = (primary != full_ident).then_some(full_ident);
            let const_ident = primary;
            let mut value_path = location_path.clone();
            value_path.extend([2, idx as i32]);
            EnumValueModel {
                name: value.name().to_string(),
                number: value.number(),
                const_ident,
                legacy_alias,
                deprecated: value
                    .options
                    .as_ref()
                    .map_or(false, |options| options.deprecated()),
                location_path: value_path,
            }
        })
        .collect();

    EnumModel {
        fq_name: fq_name.clone(),
        rust_name,
        deprecated: desc
            .options
            .as_ref()
            .map_or(false, |options| options.deprecated()),
        legacy_json: config.legacy_json_for(&fq_name),
        values,
        location_path,
    }
}

#[derive(Default)]
struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// Claims a unique spelling of `name`, appending underscores until it no
    /// longer collides with a previously claimed or reserved name. With
    /// `mutators`, the `set_`/`has_`/`clear_` spellings are claimed alongside
    /// so the whole accessor surface of the name stays collision-free.
    fn claim(&mut self, name: &str, mutators: bool) -> String {
        let mut candidate = name.to_string();
        loop {
            let mut names = vec![candidate.clone()];
            if mutators {
                names.push(format!("set_{}", candidate));
                names.push(format!("has_{}", candidate));
                names.push(format!("clear_{}", candidate));
            }
            if names.iter().all(|name| !self.taken.contains(name)) {
                self.taken.extend(names);
                return candidate;
            }
            candidate.push('_');
        }
    }
}

/// Global registry of every message and enum type declared across all input
/// files, used for cross-file type resolution and enum default references.
#[derive(Debug, Default)]
pub struct TypeMap {
    messages: HashMap<String, TypeEntry>,
    enums: HashMap<String, EnumEntry>,
}

#[derive(Debug)]
pub struct TypeEntry {
    pub package: String,
    pub rust_name: String,
}

#[derive(Debug)]
pub struct EnumEntry {
    pub package: String,
    pub rust_name: String,
    /// Primary constant identifier of the first declared value.
    pub first_value_ident: String,
    pub first_value_number: i32,
    /// Declared (name, number) pairs, for resolving named default values.
    pub values: Vec<(String, i32)>,
}

impl EnumEntry {
    pub fn number_of(&self, value_name: &str) -> i32 {
        self.values
            .iter()
            .find(|(name, _)| name == value_name)
            .map(|(_, number)| *number)
            .unwrap_or_else(|| panic!("unknown enum value: {}", value_name))
    }
}

/// The primary constant identifier of an enum value under the active
/// prefix-stripping policy.
pub fn enum_value_ident(config: &Config, enum_rust_name: &str, value_name: &str) -> String {
    if config.strip_enum_prefix {
        format!(
            "{}_{}",
            enum_rust_name,
            strip_enum_value_prefix(enum_rust_name, value_name)
        )
    } else {
        format!("{}_{}", enum_rust_name, value_name)
    }
}

impl TypeMap {
    pub fn build<'a, I>(files: I, config: &Config) -> TypeMap
    where
        I: IntoIterator<Item = &'a FileDescriptorProto>,
    {
        let mut map = TypeMap::default();
        for file in files {
            let package = file.package().to_string();
            let fq_prefix = if package.is_empty() {
                String::new()
            } else {
                format!(".{}", package)
            };
            for message in &file.message_type {
                map.add_message(config, &package, message, &fq_prefix, "");
            }
            for desc in &file.enum_type {
                map.add_enum(config, &package, desc, &fq_prefix, "");
            }
        }
        map
    }

    fn add_message(
        &mut self,
        config: &Config,
        package: &str,
        message: &DescriptorProto,
        fq_prefix: &str,
        rust_prefix: &str,
    ) {
        let fq_name = format!("{}.{}", fq_prefix, message.name());
        let rust_name = if rust_prefix.is_empty() {
            to_upper_camel(message.name())
        } else {
            format!("{}_{}", rust_prefix, to_upper_camel(message.name()))
        };
        self.messages.insert(
            fq_name.clone(),
            TypeEntry {
                package: package.to_string(),
                rust_name: rust_name.clone(),
            },
        );
        for nested in &message.nested_type {
            self.add_message(config, package, nested, &fq_name, &rust_name);
        }
        for desc in &message.enum_type {
            self.add_enum(config, package, desc, &fq_name, &rust_name);
        }
    }

    fn add_enum(
        &mut self,
        config: &Config,
        package: &str,
        desc: &EnumDescriptorProto,
        fq_prefix: &str,
        rust_prefix: &str,
    ) {
        let fq_name = format!("{}.{}", fq_prefix, desc.name());
        let rust_name = if rust_prefix.is_empty() {
            to_upper_camel(desc.name())
        } else {
            format!("{}_{}", rust_prefix, to_upper_camel(desc.name()))
        };
        let first = desc.value.first();
        let first_value_ident = first.map_or_else(String::new, |value| {
            enum_value_ident(config, &rust_name, value.name())
        });
        self.enums.insert(
            fq_name,
            EnumEntry {
                package: package.to_string(),
                first_value_ident,
                first_value_number: first.map_or(0, |value| value.number()),
                values: desc
                    .value
                    .iter()
                    .map(|value| (value.name().to_string(), value.number()))
                    .collect(),
                rust_name,
            },
        );
    }

    pub fn message(&self, fq_name: &str) -> &TypeEntry {
        self.messages
            .get(fq_name)
            .unwrap_or_else(|| panic!("unknown message type: {}", fq_name))
    }

    pub fn enum_(&self, fq_name: &str) -> &EnumEntry {
        self.enums
            .get(fq_name)
            .unwrap_or_else(|| panic!("unknown enum type: {}", fq_name))
    }

    /// Resolves a fully qualified message or enum name to a Rust path
    /// relative to `current_package`, chaining `super` segments for the
    /// common-ancestor hop exactly as the generated module tree nests
    /// packages.
    pub fn resolve(&self, fq_name: &str, current_package: &str) -> String {
        assert_eq!(".", &fq_name[..1]);
        let entry_package = if let Some(entry) = self.messages.get(fq_name) {
            &entry.package
        } else {
            &self.enum_(fq_name).package
        };
        let rust_name = if let Some(entry) = self.messages.get(fq_name) {
            &entry.rust_name
        } else {
            &self.enum_(fq_name).rust_name
        };
        let module = relative_module(current_package, entry_package);
        if module.is_empty() {
            rust_name.clone()
        } else {
            format!("{}::{}", module, rust_name)
        }
    }
}

/// The Rust module path leading from `current_package`'s module to
/// `target_package`'s module; empty when the packages are equal.
pub fn relative_module(current_package: &str, target_package: &str) -> String {
    let mut local = current_package
        .split('.')
        .filter(|s| !s.is_empty())
        .peekable();
    let mut target = target_package
        .split('.')
        .filter(|s| !s.is_empty())
        .peekable();

    // Skip path elements in common.
    while local.peek().is_some() && local.peek() == target.peek() {
        local.next();
        target.next();
    }

    local
        .map(|_| "super".to_string())
        .chain(target.map(to_snake))
        .join("::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn field(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(kind as i32),
            ..Default::default()
        }
    }

    fn file_with_message(message: DescriptorProto) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("test.proto".to_string()),
            package: Some("test".to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![message],
            ..Default::default()
        }
    }

    #[test]
    fn test_relative_module() {
        assert_eq!("", relative_module("a.b", "a.b"));
        assert_eq!("super::c", relative_module("a.b", "a.c"));
        assert_eq!("super::super::x::y", relative_module("a.b", "x.y"));
        assert_eq!("b", relative_module("a", "a.b"));
        assert_eq!("super", relative_module("a.b", "a"));
    }

    #[test]
    fn test_bookkeeping_name_collision() {
        let message = DescriptorProto {
            name: Some("Widget".to_string()),
            field: vec![field("state", 1, Type::String), field("color", 2, Type::String)],
            ..Default::default()
        };
        let model = FileModel::build(&file_with_message(message), &Config::default());
        // `state` collides with the fixed bookkeeping slot and is renamed.
        assert_eq!("state_", model.messages[0].fields[0].rust_name);
        assert_eq!("color", model.messages[0].fields[1].rust_name);
    }

    #[test]
    fn test_fixed_method_name_collision() {
        let message = DescriptorProto {
            name: Some("Widget".to_string()),
            field: vec![
                field("reset", 1, Type::String),
                field("msg_reflect", 2, Type::Int32),
                field("descriptor", 3, Type::Bool),
            ],
            ..Default::default()
        };
        let model = FileModel::build(&file_with_message(message), &Config::default());
        // Getters share the impl namespace with the fixed methods, so the
        // colliding spellings are renamed like any other collision.
        assert_eq!("reset_", model.messages[0].fields[0].rust_name);
        assert_eq!("msg_reflect_", model.messages[0].fields[1].rust_name);
        assert_eq!("descriptor_", model.messages[0].fields[2].rust_name);
    }

    #[test]
    fn test_opaque_mutator_name_collision() {
        let message = DescriptorProto {
            name: Some("Widget".to_string()),
            field: vec![
                field("set_count", 1, Type::String),
                field("count", 2, Type::Uint32),
            ],
            ..Default::default()
        };
        let mut config = Config::default();
        config.default_api_level(ApiLevel::Opaque);
        let model = FileModel::build(&file_with_message(message), &config);
        // `set_count` was claimed by the first field's own accessor, so the
        // second field steps aside to keep its mutator spelling unique.
        assert_eq!("set_count", model.messages[0].fields[0].rust_name);
        assert_eq!("count_", model.messages[0].fields[1].rust_name);
    }

    #[test]
    fn test_nested_flattening() {
        let message = DescriptorProto {
            name: Some("Outer".to_string()),
            nested_type: vec![DescriptorProto {
                name: Some("Inner".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let model = FileModel::build(&file_with_message(message), &Config::default());
        let names: Vec<_> = model.messages.iter().map(|m| m.rust_name.as_str()).collect();
        assert_eq!(vec!["Outer", "Outer_Inner"], names);
        assert_eq!(".test.Outer.Inner", model.messages[1].fq_name);
        assert_eq!(vec![4, 0, 3, 0], model.messages[1].location_path);
    }

    #[test]
    fn test_map_entry_consumed() {
        let entry = DescriptorProto {
            name: Some("TagsEntry".to_string()),
            field: vec![field("key", 1, Type::String), field("value", 2, Type::Int32)],
            options: Some(prost_types::MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut map_field = field("tags", 1, Type::Message);
        map_field.type_name = Some(".test.Widget.TagsEntry".to_string());
        map_field.label = Some(Label::Repeated as i32);
        let message = DescriptorProto {
            name: Some("Widget".to_string()),
            field: vec![map_field],
            nested_type: vec![entry],
            ..Default::default()
        };
        let model = FileModel::build(&file_with_message(message), &Config::default());
        assert_eq!(1, model.messages.len());
        let tags = &model.messages[0].fields[0];
        assert!(tags.is_map());
        let (key, value) = &**tags.map_entry.as_ref().unwrap();
        assert_eq!(Type::String, key.kind);
        assert_eq!(Type::Int32, value.kind);
    }

    #[test]
    fn test_synthetic_oneof() {
        let mut opt_field = field("serial", 1, Type::Int64);
        opt_field.proto3_optional = Some(true);
        opt_field.oneof_index = Some(0);
        let message = DescriptorProto {
            name: Some("Widget".to_string()),
            field: vec![opt_field],
            oneof_decl: vec![prost_types::OneofDescriptorProto {
                name: Some("_serial".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let model = FileModel::build(&file_with_message(message), &Config::default());
        let msg = &model.messages[0];
        assert!(msg.oneofs[0].synthetic);
        assert!(msg.fields[0].has_presence);
        assert!(msg.fields[0].real_oneof_index(msg).is_none());
    }

    #[test]
    fn test_promote_to_opaque() {
        let message = DescriptorProto {
            name: Some("Widget".to_string()),
            nested_type: vec![DescriptorProto {
                name: Some("Inner".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut config = Config::default();
        config.default_api_level = ApiLevel::Hybrid;
        let mut model = FileModel::build(&file_with_message(message), &config);
        assert_eq!(ApiLevel::Hybrid, model.api_level);
        model.promote_to_opaque();
        assert!(model.messages.iter().all(|m| m.api_level == ApiLevel::Opaque));
    }
}
