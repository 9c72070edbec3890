use log::debug;
use prost_types::field_descriptor_proto::Type;

use super::*;
use crate::model::ExtensionModel;
use crate::{tags, types};

impl CodeGenerator<'_> {
    /// The shared extension table plus one exported handle per extension,
    /// grouped by extended message in first-seen order.
    pub(super) fn push_extensions(&mut self) {
        let file = self.file;
        if file.extensions.is_empty() {
            return;
        }
        debug!("  emitting {} extensions", file.extensions.len());

        self.push_line(&format!(
            "const {}_extensions: [::protogen_runtime::ExtensionInfo; {}] = [",
            file.var_prefix,
            file.extensions.len(),
        ));
        self.depth += 1;
        for ext in &file.extensions {
            self.push_extension_info(ext);
        }
        self.depth -= 1;
        self.push_line("];");
        self.blank();

        // Handles grouped by target, keeping the first-seen target order.
        let mut targets: Vec<&str> = Vec::new();
        for ext in &file.extensions {
            if !targets.contains(&ext.extendee.as_str()) {
                targets.push(&ext.extendee);
            }
        }
        for target in targets {
            self.push_line(&format!(
                "// Extension fields of {}.",
                target.trim_start_matches('.'),
            ));
            for (idx, ext) in file
                .extensions
                .iter()
                .enumerate()
                .filter(|(_, ext)| ext.extendee == target)
            {
                self.push_line(&format!("// {}", declaration_comment(ext)));
                if ext.field.deprecated {
                    self.push_line(&format!(
                        "// Deprecated: Marked as deprecated in {}.",
                        file.path,
                    ));
                }
                self.push_line(&format!(
                    "pub const {}: &::protogen_runtime::ExtensionInfo = &{}_extensions[{}];",
                    ext.handle_ident, file.var_prefix, idx,
                ));
            }
            self.blank();
        }
    }

    fn push_extension_info(&mut self, ext: &ExtensionModel) {
        let value_type = if ext.field.repeated {
            format!(
                "::std::vec::Vec<{}>",
                types::base_type(&ext.field, self.type_map, &self.file.package),
            )
        } else {
            types::base_type(&ext.field, self.type_map, &self.file.package)
        };
        self.push_line("::protogen_runtime::ExtensionInfo {");
        self.depth += 1;
        self.push_line(&format!(
            "extended_type: \"{}\",",
            ext.extendee.trim_start_matches('.'),
        ));
        self.push_line(&format!("value_type: \"{}\",", value_type));
        self.push_line(&format!("number: {},", ext.field.number));
        self.push_line(&format!("name: \"{}\",", ext.full_name));
        self.push_line(&format!(
            "tag: \"{}\",",
            tags::field_tag(&ext.field, self.file.syntax),
        ));
        self.push_line(&format!("filename: \"{}\",", self.file.path));
        self.depth -= 1;
        self.push_line("},");
    }
}

/// Reconstructs the schema's textual declaration of the extension field.
fn declaration_comment(ext: &ExtensionModel) -> String {
    let cardinality = if ext.field.repeated {
        "repeated"
    } else if ext.field.required {
        "required"
    } else {
        "optional"
    };
    format!(
        "{} {} {} = {};",
        cardinality,
        proto_type_name(&ext.field.kind, &ext.field.type_name),
        ext.field.name,
        ext.field.number,
    )
}

fn proto_type_name<'a>(kind: &Type, type_name: &'a str) -> &'a str {
    match kind {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
        Type::Message | Type::Group | Type::Enum => type_name.trim_start_matches('.'),
    }
}
