use std::collections::HashSet;

use log::debug;
use prost_types::field_descriptor_proto::Type;

use super::*;
use crate::ident::to_upper_camel;
use crate::model::{desc_indexes, FieldModel, MessageModel};
use crate::{defaults, tags, types};

impl CodeGenerator<'_> {
    pub(super) fn push_message(&mut self, idx: usize) {
        let file = self.file;
        let msg = &file.messages[idx];
        debug!("  emitting message: {:?}", msg.fq_name);

        self.push_struct(msg);
        self.push_default_decls(msg);
        self.push_accessor_impl(msg, idx);
        self.push_fixed_impls(msg, idx);
        self.push_oneof_types(msg);
    }

    fn push_struct(&mut self, msg: &MessageModel) {
        let opaque = self.opaque(msg.api_level);
        self.append_doc(&msg.location_path, msg.deprecated);
        self.push_line(
            "#[derive(Clone, Default, PartialEq, ::protogen_runtime::Message)]",
        );
        self.push_line(&format!("pub struct {} {{", msg.rust_name));
        self.depth += 1;

        // Bookkeeping slots come first, always in this order.
        self.push_line("state: ::protogen_runtime::MessageState,");
        self.push_line("size_cache: ::protogen_runtime::SizeCache,");
        self.push_line("unknown_fields: ::protogen_runtime::UnknownFields,");
        if msg.has_extension_ranges {
            self.push_line("extension_fields: ::protogen_runtime::ExtensionFields,");
        }

        let vis = if opaque { "" } else { "pub " };
        let mut emitted_oneofs = HashSet::new();
        for field in &msg.fields {
            if let Some(oneof_idx) = field.real_oneof_index(msg) {
                // A oneof collapses to a single slot at its first member's
                // position; later members are skipped.
                if emitted_oneofs.insert(oneof_idx) {
                    let oneof = &msg.oneofs[oneof_idx];
                    self.append_doc(&oneof.location_path, false);
                    if msg.tracked {
                        self.push_line(&format!(
                            "#[field_meta(\"{}\")]",
                            tags::render_meta(&[tags::track_pair()]),
                        ));
                    }
                    self.push_line(&format!(
                        "{}{}: ::core::option::Option<{}>,",
                        vis, oneof.rust_name, oneof.type_name,
                    ));
                }
                continue;
            }

            self.append_doc(&field.location_path, field.deprecated);
            let meta =
                tags::render_meta(&tags::meta_pairs(field, self.file.syntax, msg.tracked));
            self.push_line(&format!("#[field_meta(\"{}\")]", meta));
            let ty = types::storage_type(field, self.type_map, &self.file.package);
            let mut line = format!("{}{}: {},", vis, field.rust_name, ty);
            if let Some(trailing) = self.trailing_comment(&field.location_path) {
                line.push(' ');
                line.push_str(&trailing);
            }
            self.push_line(&line);
        }

        self.depth -= 1;
        self.push_line("}");
        self.blank();
    }

    /// Named constants for explicit schema defaults, emitted ahead of the
    /// accessors that reference them.
    fn push_default_decls(&mut self, msg: &MessageModel) {
        let mut any = false;
        for field in &msg.fields {
            let decl = match defaults::explicit_default_decl(
                field,
                &msg.rust_name,
                self.type_map,
                &self.file.package,
                self.config,
            ) {
                Some(decl) => decl,
                None => continue,
            };
            if !any {
                self.push_line(&format!("// Default values for {} fields.", msg.rust_name));
                any = true;
            }
            if decl.is_static {
                self.push_line(&format!(
                    "pub static {}: {} = {};",
                    decl.ident, decl.ty, decl.expr,
                ));
            } else {
                self.push_line(&format!(
                    "pub const {}: {} = {};",
                    decl.ident, decl.ty, decl.expr,
                ));
            }
        }
        if any {
            self.blank();
        }
    }

    fn push_accessor_impl(&mut self, msg: &MessageModel, idx: usize) {
        let opaque = self.opaque(msg.api_level);
        self.push_line(&format!("impl {} {{", msg.rust_name));
        self.depth += 1;

        self.push_line("pub fn reset(&mut self) {");
        self.push_line("    *self = Self::default();");
        self.push_line(&format!(
            "    ::protogen_runtime::reflect::message_state_of(&mut self.state, &{}_msg_types[{}]);",
            self.file.var_prefix, idx,
        ));
        self.push_line("}");

        let mut emitted_oneofs = HashSet::new();
        for field in &msg.fields {
            if let Some(oneof_idx) = field.real_oneof_index(msg) {
                if emitted_oneofs.insert(oneof_idx) {
                    self.push_oneof_getter(msg, oneof_idx, opaque);
                }
                self.push_oneof_member_getter(msg, oneof_idx, field);
                if opaque {
                    self.push_oneof_member_mutators(msg, oneof_idx, field);
                }
                continue;
            }
            self.push_getter(msg, field);
            if opaque {
                self.push_field_mutators(field);
            }
        }

        if self.raw_descriptors(&msg.fq_name) {
            self.need_raw_desc_gzip = true;
            let indexes = desc_indexes(&msg.location_path)
                .iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.blank();
            self.push_line("/// Deprecated: Use the reflection descriptor handle instead.");
            self.push_line(
                "pub fn descriptor() -> (::std::vec::Vec<u8>, &'static [i32]) {",
            );
            self.push_line(&format!(
                "    ({}_raw_desc_gzip(), &[{}])",
                self.file.var_prefix, indexes,
            ));
            self.push_line("}");
        }

        self.depth -= 1;
        self.push_line("}");
        self.blank();
    }

    /// The getter of an ordinary (non-oneof-member) field: stored value when
    /// set, declared default otherwise.
    fn push_getter(&mut self, msg: &MessageModel, field: &FieldModel) {
        let name = &field.rust_name;
        let file = self.file;
        let package = &file.package;

        self.blank();
        if field.is_map() {
            let ty = types::storage_type(field, self.type_map, package);
            self.push_line(&format!("pub fn {}(&self) -> &{} {{", name, ty));
            self.push_line(&format!("    &self.{}", name));
            self.push_line("}");
            return;
        }
        if field.repeated {
            let base = types::base_type(field, self.type_map, package);
            self.push_line(&format!("pub fn {}(&self) -> &[{}] {{", name, base));
            self.push_line(&format!("    &self.{}", name));
            self.push_line("}");
            return;
        }

        match field.kind {
            Type::Message | Type::Group => {
                let base = types::base_type(field, self.type_map, package);
                self.push_line(&format!(
                    "pub fn {}(&self) -> ::core::option::Option<&{}> {{",
                    name, base,
                ));
                self.push_line(&format!("    self.{}.as_deref()", name));
                self.push_line("}");
            }
            Type::String => {
                self.push_line(&format!("pub fn {}(&self) -> &str {{", name));
                if field.has_presence {
                    self.push_line(&format!(
                        "    self.{}.as_deref().unwrap_or({})",
                        name,
                        self.string_default(msg, field),
                    ));
                } else {
                    self.push_line(&format!("    self.{}.as_str()", name));
                }
                self.push_line("}");
            }
            Type::Bytes => {
                self.push_line(&format!("pub fn {}(&self) -> &[u8] {{", name));
                if field.default_value.is_some() {
                    self.push_line(&format!("    if !self.{}.is_empty() {{", name));
                    self.push_line(&format!("        return &self.{};", name));
                    self.push_line("    }");
                    self.push_line(&format!(
                        "    {}",
                        defaults::default_ident(&msg.rust_name, field),
                    ));
                } else {
                    self.push_line(&format!("    &self.{}", name));
                }
                self.push_line("}");
            }
            _ => {
                let base = types::base_type(field, self.type_map, package);
                self.push_line(&format!("pub fn {}(&self) -> {} {{", name, base));
                if field.has_presence {
                    self.push_line(&format!(
                        "    self.{}.unwrap_or({})",
                        name,
                        self.scalar_default(msg, field),
                    ));
                } else {
                    self.push_line(&format!("    self.{}", name));
                }
                self.push_line("}");
            }
        }
    }

    /// The getter of a non-synthetic oneof slot: the active case, if any.
    fn push_oneof_getter(&mut self, msg: &MessageModel, oneof_idx: usize, opaque: bool) {
        let oneof = &msg.oneofs[oneof_idx];
        self.blank();
        self.push_line(&format!(
            "pub fn {}(&self) -> ::core::option::Option<&{}> {{",
            oneof.rust_name, oneof.type_name,
        ));
        self.push_line(&format!("    self.{}.as_ref()", oneof.rust_name));
        self.push_line("}");
        if opaque {
            self.blank();
            self.push_line(&format!(
                "pub fn set_{}(&mut self, v: {}) {{",
                oneof.rust_name, oneof.type_name,
            ));
            self.push_line(&format!(
                "    self.{} = ::core::option::Option::Some(v);",
                oneof.rust_name,
            ));
            self.push_line("}");
            self.blank();
            self.push_line(&format!("pub fn has_{}(&self) -> bool {{", oneof.rust_name));
            self.push_line(&format!("    self.{}.is_some()", oneof.rust_name));
            self.push_line("}");
            self.blank();
            self.push_line(&format!("pub fn clear_{}(&mut self) {{", oneof.rust_name));
            self.push_line(&format!(
                "    self.{} = ::core::option::Option::None;",
                oneof.rust_name,
            ));
            self.push_line("}");
        }
    }

    /// The getter of a oneof member: matches on the oneof's own getter and
    /// returns the wrapped value or the default.
    fn push_oneof_member_getter(
        &mut self,
        msg: &MessageModel,
        oneof_idx: usize,
        field: &FieldModel,
    ) {
        let oneof = &msg.oneofs[oneof_idx];
        let variant = format!("{}::{}", oneof.type_name, to_upper_camel(&field.name));
        let name = &field.rust_name;
        let file = self.file;
        let package = &file.package;

        self.blank();
        match field.kind {
            Type::Message | Type::Group => {
                let base = types::base_type(field, self.type_map, package);
                self.push_line(&format!(
                    "pub fn {}(&self) -> ::core::option::Option<&{}> {{",
                    name, base,
                ));
                self.push_line(&format!("    match self.{}() {{", oneof.rust_name));
                self.push_line(&format!(
                    "        ::core::option::Option::Some({}(v)) => ::core::option::Option::Some(&**v),",
                    variant,
                ));
                self.push_line("        _ => ::core::option::Option::None,");
                self.push_line("    }");
                self.push_line("}");
            }
            Type::String => {
                self.push_line(&format!("pub fn {}(&self) -> &str {{", name));
                self.push_line(&format!("    match self.{}() {{", oneof.rust_name));
                self.push_line(&format!(
                    "        ::core::option::Option::Some({}(v)) => v.as_str(),",
                    variant,
                ));
                self.push_line(&format!(
                    "        _ => {},",
                    self.string_default(msg, field),
                ));
                self.push_line("    }");
                self.push_line("}");
            }
            Type::Bytes => {
                self.push_line(&format!("pub fn {}(&self) -> &[u8] {{", name));
                self.push_line(&format!("    match self.{}() {{", oneof.rust_name));
                self.push_line(&format!(
                    "        ::core::option::Option::Some({}(v)) => v.as_slice(),",
                    variant,
                ));
                let default = if field.default_value.is_some() {
                    defaults::default_ident(&msg.rust_name, field)
                } else {
                    "&[]".to_string()
                };
                self.push_line(&format!("        _ => {},", default));
                self.push_line("    }");
                self.push_line("}");
            }
            _ => {
                let base = types::base_type(field, self.type_map, package);
                self.push_line(&format!("pub fn {}(&self) -> {} {{", name, base));
                self.push_line(&format!("    match self.{}() {{", oneof.rust_name));
                self.push_line(&format!(
                    "        ::core::option::Option::Some({}(v)) => *v,",
                    variant,
                ));
                self.push_line(&format!(
                    "        _ => {},",
                    self.scalar_default(msg, field),
                ));
                self.push_line("    }");
                self.push_line("}");
            }
        }
    }

    /// Opaque-shape mutators for an ordinary field.
    fn push_field_mutators(&mut self, field: &FieldModel) {
        let name = &field.rust_name;
        let file = self.file;
        let package = &file.package;
        let stored = types::storage_type(field, self.type_map, package);

        self.blank();
        match field.kind {
            Type::Message | Type::Group => {
                let base = types::base_type(field, self.type_map, package);
                self.push_line(&format!("pub fn set_{}(&mut self, v: {}) {{", name, base));
                self.push_line(&format!(
                    "    self.{} = ::core::option::Option::Some(::std::boxed::Box::new(v));",
                    name,
                ));
                self.push_line("}");
                self.blank();
                self.push_line(&format!("pub fn has_{}(&self) -> bool {{", name));
                self.push_line(&format!("    self.{}.is_some()", name));
                self.push_line("}");
                self.blank();
                self.push_line(&format!("pub fn clear_{}(&mut self) {{", name));
                self.push_line(&format!(
                    "    self.{} = ::core::option::Option::None;",
                    name,
                ));
                self.push_line("}");
            }
            Type::Bytes => {
                self.push_line(&format!(
                    "pub fn set_{}(&mut self, v: ::std::vec::Vec<u8>) {{",
                    name,
                ));
                self.push_line(&format!("    self.{} = v;", name));
                self.push_line("}");
                if field.has_presence {
                    // Byte storage cannot carry set-but-empty; emptiness is
                    // the absence signal.
                    self.blank();
                    self.push_line(&format!("pub fn has_{}(&self) -> bool {{", name));
                    self.push_line(&format!("    !self.{}.is_empty()", name));
                    self.push_line("}");
                    self.blank();
                    self.push_line(&format!("pub fn clear_{}(&mut self) {{", name));
                    self.push_line(&format!("    self.{}.clear();", name));
                    self.push_line("}");
                }
            }
            _ if field.is_map() || field.repeated => {
                self.push_line(&format!("pub fn set_{}(&mut self, v: {}) {{", name, stored));
                self.push_line(&format!("    self.{} = v;", name));
                self.push_line("}");
            }
            _ => {
                let base = types::base_type(field, self.type_map, package);
                self.push_line(&format!("pub fn set_{}(&mut self, v: {}) {{", name, base));
                if field.has_presence {
                    self.push_line(&format!(
                        "    self.{} = ::core::option::Option::Some(v);",
                        name,
                    ));
                } else {
                    self.push_line(&format!("    self.{} = v;", name));
                }
                self.push_line("}");
                if field.has_presence {
                    self.blank();
                    self.push_line(&format!("pub fn has_{}(&self) -> bool {{", name));
                    self.push_line(&format!("    self.{}.is_some()", name));
                    self.push_line("}");
                    self.blank();
                    self.push_line(&format!("pub fn clear_{}(&mut self) {{", name));
                    self.push_line(&format!(
                        "    self.{} = ::core::option::Option::None;",
                        name,
                    ));
                    self.push_line("}");
                }
            }
        }
    }

    /// Opaque-shape mutators for a oneof member: setting one case evicts
    /// whatever case was active before.
    fn push_oneof_member_mutators(
        &mut self,
        msg: &MessageModel,
        oneof_idx: usize,
        field: &FieldModel,
    ) {
        let oneof = &msg.oneofs[oneof_idx];
        let variant = format!("{}::{}", oneof.type_name, to_upper_camel(&field.name));
        let name = &field.rust_name;
        let file = self.file;
        let package = &file.package;

        self.blank();
        let base = types::base_type(field, self.type_map, package);
        self.push_line(&format!("pub fn set_{}(&mut self, v: {}) {{", name, base));
        let payload = match field.kind {
            Type::Message | Type::Group => "::std::boxed::Box::new(v)",
            _ => "v",
        };
        self.push_line(&format!(
            "    self.{} = ::core::option::Option::Some({}({}));",
            oneof.rust_name, variant, payload,
        ));
        self.push_line("}");
        self.blank();
        self.push_line(&format!("pub fn has_{}(&self) -> bool {{", name));
        self.push_line(&format!(
            "    matches!(self.{}, ::core::option::Option::Some({}(_)))",
            oneof.rust_name, variant,
        ));
        self.push_line("}");
        self.blank();
        self.push_line(&format!("pub fn clear_{}(&mut self) {{", name));
        self.push_line(&format!(
            "    if matches!(self.{}, ::core::option::Option::Some({}(_))) {{",
            oneof.rust_name, variant,
        ));
        self.push_line(&format!(
            "        self.{} = ::core::option::Option::None;",
            oneof.rust_name,
        ));
        self.push_line("    }");
        self.push_line("}");
    }

    fn push_fixed_impls(&mut self, msg: &MessageModel, idx: usize) {
        self.push_line(&format!("impl ::std::fmt::Display for {} {{", msg.rust_name));
        self.depth += 1;
        self.push_line(
            "fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {",
        );
        self.push_line("    ::protogen_runtime::reflect::message_string_of(self, f)");
        self.push_line("}");
        self.depth -= 1;
        self.push_line("}");
        self.blank();

        self.push_line(&format!(
            "impl ::protogen_runtime::ProtoMessage for {} {{}}",
            msg.rust_name,
        ));
        self.blank();

        self.push_line(&format!("impl {} {{", msg.rust_name));
        self.depth += 1;
        self.push_line(
            "pub fn msg_reflect(&self) -> ::protogen_runtime::reflect::MessageRef {",
        );
        self.push_line(&format!(
            "    ::protogen_runtime::reflect::message_ref(self, &{}_msg_types[{}])",
            self.file.var_prefix, idx,
        ));
        self.push_line("}");
        self.depth -= 1;
        self.push_line("}");
        self.blank();
    }

    /// One sum type per non-synthetic oneof, with the member wire tags
    /// carried on the variants.
    fn push_oneof_types(&mut self, msg: &MessageModel) {
        for oneof in msg.oneofs.iter().filter(|oneof| !oneof.synthetic) {
            self.push_line(&format!(
                "/// Cases of the `{}` oneof of `{}`.",
                oneof.name, msg.rust_name,
            ));
            self.push_line("#[derive(Clone, PartialEq, ::protogen_runtime::Oneof)]");
            self.push_line(&format!("pub enum {} {{", oneof.type_name));
            self.depth += 1;
            for &member_idx in &oneof.fields {
                let field = &msg.fields[member_idx];
                self.append_doc(&field.location_path, field.deprecated);
                let mut pairs = vec![("wire", tags::field_tag(field, self.file.syntax))];
                if msg.tracked {
                    pairs.push(tags::track_pair());
                }
                self.push_line(&format!(
                    "#[field_meta(\"{}\")]",
                    tags::render_meta(&pairs),
                ));
                self.push_line(&format!(
                    "{}({}),",
                    to_upper_camel(&field.name),
                    types::variant_type(field, self.type_map, &self.file.package),
                ));
            }
            self.depth -= 1;
            self.push_line("}");
            self.blank();
        }
    }

    /// The unset-value expression of a string getter: `&str` typed.
    fn string_default(&self, msg: &MessageModel, field: &FieldModel) -> String {
        if field.default_value.is_some() {
            defaults::default_ident(&msg.rust_name, field)
        } else {
            "\"\"".to_string()
        }
    }

    /// The unset-value expression of a Copy scalar or enum getter.
    fn scalar_default(&self, msg: &MessageModel, field: &FieldModel) -> String {
        if field.default_value.is_some() {
            defaults::default_ident(&msg.rust_name, field)
        } else {
            defaults::implicit_default_expr(field, self.type_map, &self.file.package)
        }
    }
}
