//! Text emission for one generated source file. The generator walks the
//! derived file model and appends declarations to a string buffer; the
//! submodules contribute the per-declaration emitters.

mod enums;
mod extensions;
mod forward;
mod messages;

pub use forward::forward_block;

use log::debug;

use crate::model::{ApiLevel, FileModel, TypeMap};
use crate::Config;

/// Which `#![cfg]` discriminator a variant of a hybrid file carries. Files
/// with a single variant carry none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    Only,
    HybridOpen,
    HybridOpaque,
}

pub struct CodeGenerator<'a> {
    pub(super) config: &'a Config,
    pub(super) type_map: &'a TypeMap,
    pub(super) file: &'a FileModel,
    pub(super) depth: u8,
    pub(super) buf: &'a mut String,
    /// Set when any emitted declaration referenced the gzipped raw
    /// descriptor, so the accessor is only emitted when used.
    pub(super) need_raw_desc_gzip: bool,
}

impl<'a> CodeGenerator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn generate(
        config: &Config,
        type_map: &TypeMap,
        file: &FileModel,
        raw_desc: &[u8],
        forwards: &[String],
        variant: Variant,
        buf: &mut String,
    ) {
        let mut generator = CodeGenerator {
            config,
            type_map,
            file,
            depth: 0,
            buf,
            need_raw_desc_gzip: false,
        };
        debug!(
            "generating {} ({:?}, {:?})",
            file.path, file.api_level, variant
        );

        generator.push_header();
        generator.push_file_docs();
        generator.push_lints(variant);
        generator.push_version_assertions();

        for block in forwards {
            generator.buf.push_str(block);
            generator.buf.push('\n');
        }

        for idx in 0..file.enums.len() {
            generator.push_enum(idx);
        }
        for idx in 0..file.messages.len() {
            generator.push_message(idx);
        }
        generator.push_extensions();
        generator.push_registration(raw_desc);
    }

    fn push_header(&mut self) {
        if self.config.strip_for_diff {
            return;
        }
        self.buf
            .push_str("// Code generated by protogen-build. DO NOT EDIT.\n");
        if self.config.version_markers {
            self.buf.push_str("// versions:\n");
            self.buf.push_str(&format!(
                "// \tprotogen-build v{}\n",
                self.config.producer_version
            ));
            if let Some(compiler) = &self.config.compiler_version {
                self.buf.push_str(&format!("// \tcompiler {}\n", compiler));
            }
        }
        self.buf
            .push_str(&format!("// source: {}\n\n", self.file.path));
    }

    fn push_file_docs(&mut self) {
        if self.config.strip_for_diff {
            return;
        }
        let comments = self.file.comments(&[2]);
        for line in comments
            .leading_detached
            .iter()
            .flat_map(|block| block.lines())
        {
            self.buf.push_str("//");
            if !line.trim().is_empty() && !line.starts_with(' ') {
                self.buf.push(' ');
            }
            self.buf.push_str(line);
            self.buf.push('\n');
        }
        for line in comments.leading.lines() {
            self.buf.push_str("//!");
            if !line.trim().is_empty() && !line.starts_with(' ') {
                self.buf.push(' ');
            }
            self.buf.push_str(line);
            self.buf.push('\n');
        }
        if !comments.leading.is_empty() {
            self.buf.push('\n');
        }
    }

    fn push_lints(&mut self, variant: Variant) {
        // Generated identifiers keep their schema spellings.
        self.buf.push_str("#![allow(dead_code)]\n");
        self.buf.push_str("#![allow(deprecated)]\n");
        self.buf.push_str("#![allow(non_camel_case_types)]\n");
        self.buf.push_str("#![allow(non_snake_case)]\n");
        self.buf.push_str("#![allow(non_upper_case_globals)]\n");
        match variant {
            Variant::Only => {}
            Variant::HybridOpen => {
                self.buf.push_str("#![cfg(not(proto_opaque))]\n");
            }
            Variant::HybridOpaque => {
                self.buf.push_str("#![cfg(proto_opaque)]\n");
            }
        }
        self.buf.push('\n');
    }

    fn push_version_assertions(&mut self) {
        if !self.config.version_markers {
            return;
        }
        if !self.config.strip_for_diff {
            self.buf
                .push_str("// Verify that this generated code is sufficiently up-to-date.\n");
        }
        self.buf.push_str(
            "const _: () = ::protogen_runtime::enforce_version(\n    \
             ::protogen_runtime::GEN_VERSION - ::protogen_runtime::MIN_VERSION,\n);\n",
        );
        if !self.config.strip_for_diff {
            self.buf.push_str(
                "// Verify that the runtime is sufficiently up-to-date.\n",
            );
        }
        self.buf.push_str(
            "const _: () = ::protogen_runtime::enforce_version(\n    \
             ::protogen_runtime::MAX_VERSION - ::protogen_runtime::GEN_VERSION,\n);\n\n",
        );
    }

    /// The reflection-registration block: raw descriptor bytes, the gzip
    /// accessor when some deprecated accessor referenced it, message type
    /// infos, the file descriptor singleton, and the init function.
    fn push_registration(&mut self, raw_desc: &[u8]) {
        if self.config.strip_for_diff {
            return;
        }
        let prefix = self.file.var_prefix.clone();

        self.push_line(&format!(
            "const {}_raw_desc: &[u8] = {};",
            prefix,
            crate::defaults::bytes_literal(raw_desc),
        ));
        self.blank();

        if self.need_raw_desc_gzip {
            self.push_line(&format!(
                "fn {}_raw_desc_gzip() -> ::std::vec::Vec<u8> {{",
                prefix
            ));
            self.depth += 1;
            self.push_line(&format!(
                "::protogen_runtime::reflect::compress_gzip({}_raw_desc)",
                prefix
            ));
            self.depth -= 1;
            self.push_line("}");
            self.blank();
        }

        self.push_line(&format!(
            "static {}_msg_types: [::protogen_runtime::reflect::MessageInfo; {}] = [",
            prefix,
            self.file.messages.len(),
        ));
        self.depth += 1;
        let file = self.file;
        for message in &file.messages {
            let full_name = message.fq_name.trim_start_matches('.');
            self.push_line(&format!(
                "::protogen_runtime::reflect::MessageInfo::new::<{}>(\"{}\"),",
                message.rust_name, full_name,
            ));
        }
        self.depth -= 1;
        self.push_line("];");
        self.blank();

        self.push_line(&format!(
            "/// Descriptor handle for `{}`.",
            self.file.path
        ));
        self.push_line(&format!(
            "pub static {}: ::protogen_runtime::reflect::FileHandle =",
            self.file.descriptor_ident
        ));
        self.push_line(&format!(
            "    ::protogen_runtime::reflect::FileHandle::new(\"{}\");",
            self.file.path
        ));
        self.blank();

        self.push_line(&format!("pub fn {}_init() {{", prefix));
        self.depth += 1;
        self.push_line("::protogen_runtime::reflect::register_file(");
        self.depth += 1;
        self.push_line(&format!("&{},", self.file.descriptor_ident));
        self.push_line(&format!("{}_raw_desc,", prefix));
        self.push_line(&format!("&{}_msg_types,", prefix));
        if self.file.extensions.is_empty() {
            self.push_line("&[],");
        } else {
            self.push_line(&format!("&{}_extensions,", prefix));
        }
        self.depth -= 1;
        self.push_line(");");
        self.depth -= 1;
        self.push_line("}");
    }

    // Buffer plumbing.

    pub(super) fn push_indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str("    ");
        }
    }

    pub(super) fn push_line(&mut self, line: &str) {
        self.push_indent();
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    pub(super) fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Appends the comments attached at `path`, with the deprecation notice
    /// appended when the declaration or its whole file is deprecated.
    pub(super) fn append_doc(&mut self, path: &[i32], deprecated: bool) {
        if self.config.strip_for_diff {
            return;
        }
        let mut comments = self.file.comments(path);
        comments.append_deprecation_suffix(&self.file.path, self.file.deprecated, deprecated);
        comments.append_with_indent(self.depth, self.buf);
    }

    pub(super) fn trailing_comment(&self, path: &[i32]) -> Option<String> {
        if self.config.strip_for_diff {
            return None;
        }
        self.file.comments(path).trailing_line()
    }

    /// Whether the deprecated raw-descriptor accessors are emitted for the
    /// given fully qualified type name.
    pub(super) fn raw_descriptors(&self, fq_name: &str) -> bool {
        self.config.raw_descriptors_for(fq_name)
    }

    pub(super) fn opaque(&self, api_level: ApiLevel) -> bool {
        api_level == ApiLevel::Opaque
    }
}
