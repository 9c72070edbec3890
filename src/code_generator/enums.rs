use std::collections::HashSet;

use log::debug;

use super::*;
use crate::model::{desc_indexes, EnumModel};

impl CodeGenerator<'_> {
    pub(super) fn push_enum(&mut self, idx: usize) {
        let file = self.file;
        let desc = &file.enums[idx];
        debug!("  emitting enum: {:?}", desc.fq_name);

        self.push_enum_type(desc);
        self.push_enum_consts(desc);
        self.push_enum_tables(desc);
        self.push_enum_impl(desc);
    }

    fn push_enum_type(&mut self, desc: &EnumModel) {
        self.append_doc(&desc.location_path, desc.deprecated);
        self.push_line(
            "#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]",
        );
        self.push_line(&format!("pub struct {}(pub i32);", desc.rust_name));
        self.blank();
    }

    fn push_enum_consts(&mut self, desc: &EnumModel) {
        for value in &desc.values {
            self.append_doc(&value.location_path, value.deprecated);
            let mut line = format!(
                "pub const {}: {} = {}({});",
                value.const_ident, desc.rust_name, desc.rust_name, value.number,
            );
            if let Some(trailing) = self.trailing_comment(&value.location_path) {
                line.push(' ');
                line.push_str(&trailing);
            }
            self.push_line(&line);
        }
        self.blank();

        let aliases: Vec<(&str, &str)> = desc
            .values
            .iter()
            .filter_map(|value| {
                value
                    .legacy_alias
                    .as_deref()
                    .map(|alias| (alias, value.const_ident.as_str()))
            })
            .collect();
        if !aliases.is_empty() {
            self.push_line("// Aliases for the unstripped value spellings.");
            for (alias, primary) in aliases {
                self.push_line(&format!(
                    "pub const {}: {} = {};",
                    alias, desc.rust_name, primary,
                ));
            }
            self.blank();
        }
    }

    /// The number-to-name and name-to-number lookup tables. The first
    /// declared name wins per number; later duplicates stay visible as
    /// comment lines.
    fn push_enum_tables(&mut self, desc: &EnumModel) {
        self.push_line(&format!(
            "pub static {}_name: &[(i32, &str)] = &[",
            desc.rust_name
        ));
        self.depth += 1;
        let mut seen = HashSet::new();
        for value in &desc.values {
            if seen.insert(value.number) {
                self.push_line(&format!("({}, \"{}\"),", value.number, value.name));
            } else {
                self.push_line(&format!(
                    "// Duplicate value: ({}, \"{}\")",
                    value.number, value.name
                ));
            }
        }
        self.depth -= 1;
        self.push_line("];");

        self.push_line(&format!(
            "pub static {}_value: &[(&str, i32)] = &[",
            desc.rust_name
        ));
        self.depth += 1;
        for value in &desc.values {
            self.push_line(&format!("(\"{}\", {}),", value.name, value.number));
        }
        self.depth -= 1;
        self.push_line("];");
        self.blank();
    }

    fn push_enum_impl(&mut self, desc: &EnumModel) {
        let name = desc.rust_name.clone();

        self.push_line(&format!("impl {} {{", name));
        self.depth += 1;
        self.push_line(&format!(
            "pub fn boxed(self) -> ::std::boxed::Box<{}> {{",
            name
        ));
        self.push_line("    ::std::boxed::Box::new(self)");
        self.push_line("}");
        if desc.legacy_json {
            self.blank();
            self.push_line("pub fn unmarshal_json(");
            self.push_line("    b: &[u8],");
            self.push_line(&format!(
                ") -> ::std::result::Result<{}, ::protogen_runtime::reflect::UnknownEnumError> {{",
                name
            ));
            self.push_line(&format!(
                "    ::protogen_runtime::reflect::enum_from_json({}_value, \"{}\", b).map({})",
                name,
                desc.fq_name.trim_start_matches('.'),
                name,
            ));
            self.push_line("}");
        }
        if self.raw_descriptors(&desc.fq_name) {
            let indexes = desc_indexes(&desc.location_path);
            self.need_raw_desc_gzip = true;
            self.blank();
            self.push_line(
                "/// Deprecated: Use the reflection descriptor handle instead.",
            );
            self.push_line(
                "pub fn enum_descriptor() -> (::std::vec::Vec<u8>, &'static [i32]) {",
            );
            self.push_line(&format!(
                "    ({}_raw_desc_gzip(), &[{}])",
                self.file.var_prefix,
                indexes
                    .iter()
                    .map(i32::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ));
            self.push_line("}");
        }
        self.depth -= 1;
        self.push_line("}");
        self.blank();

        self.push_line(&format!("impl ::std::fmt::Display for {} {{", name));
        self.depth += 1;
        self.push_line(
            "fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {",
        );
        self.push_line(&format!(
            "    f.write_str(&::protogen_runtime::reflect::enum_string_of({}_name, self.0))",
            name
        ));
        self.push_line("}");
        self.depth -= 1;
        self.push_line("}");
        self.blank();
    }
}
