//! `protogen-build` turns compiled schema descriptors into Rust source text.
//!
//! Given a set of [`prost_types::FileDescriptorProto`] inputs, the generator
//! emits one Rust source file per requested schema file: message structs with
//! their accessor methods, enum newtypes with name/value tables, extension
//! handle tables, public-import forwarding blocks, and the reflection
//! registration plumbing that wires the emitted types into the runtime
//! library.
//!
//! ```rust,no_run
//! use protogen_build::{Config, Generator};
//!
//! # fn run(descriptors: Vec<prost_types::FileDescriptorProto>) {
//! let mut config = Config::new();
//! config.strip_enum_prefix(true);
//! let generator = Generator::new(config, descriptors);
//! let outputs = generator.generate(&["example.proto"]).unwrap();
//! for file in outputs.files {
//!     println!("writing {} ({} bytes)", file.name, file.content.len());
//! }
//! # }
//! ```
//!
//! All configuration is explicit on the [`Config`] handed to each
//! [`Generator`]; there is no process-global state.

mod ast;
mod code_generator;
mod defaults;
mod ident;
mod model;
mod tags;
mod types;

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, info};
use prost::Message as _;
use prost_types::FileDescriptorProto;

use crate::code_generator::{forward_block, CodeGenerator, Variant};
use crate::model::{relative_module, FileModel, TypeMap};

pub use crate::model::ApiLevel;

/// Code generation failures.
///
/// `Internal` marks a consistency violation in the generator itself and
/// aborts the whole run. The other kinds are collaborator failures: they
/// fail the affected file and accumulate, letting the remaining files
/// generate.
#[derive(Debug)]
pub enum Error {
    /// The generator produced or encountered something it never should have.
    Internal(String),
    /// A generated dependency could not be parsed back for forwarding.
    Parse { path: String, message: String },
    /// A requested or imported file is not among the inputs.
    MissingFile(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Internal(message) => write!(f, "internal error: {}", message),
            Error::Parse { path, message } => {
                write!(f, "failed to parse generated output of {}: {}", path, message)
            }
            Error::MissingFile(path) => write!(f, "file not found: {}", path),
        }
    }
}

impl std::error::Error for Error {}

/// Code generation options.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) version_markers: bool,
    pub(crate) strip_for_diff: bool,
    pub(crate) strip_enum_prefix: bool,
    pub(crate) default_api_level: ApiLevel,
    pub(crate) api_levels: Vec<(String, ApiLevel)>,
    pub(crate) legacy_json: Vec<String>,
    pub(crate) raw_descriptors: Vec<String>,
    pub(crate) field_tracking: Vec<String>,
    pub(crate) producer_version: String,
    pub(crate) compiler_version: Option<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            version_markers: true,
            strip_for_diff: false,
            strip_enum_prefix: true,
            default_api_level: ApiLevel::Open,
            api_levels: Vec::new(),
            legacy_json: Vec::new(),
            raw_descriptors: Vec::new(),
            field_tracking: Vec::new(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
            compiler_version: None,
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Toggles the producer/compiler version markers in the generated file
    /// header and the runtime version-compat assertions.
    pub fn version_markers(&mut self, enabled: bool) -> &mut Config {
        self.version_markers = enabled;
        self
    }

    /// Strips volatile sections (headers, comments, the registration block)
    /// so two generator builds can be diffed structurally.
    pub fn strip_for_diff(&mut self, enabled: bool) -> &mut Config {
        self.strip_for_diff = enabled;
        self
    }

    /// Strips redundant enum-name prefixes from value constants, keeping the
    /// unstripped spelling as an alias constant.
    pub fn strip_enum_prefix(&mut self, enabled: bool) -> &mut Config {
        self.strip_enum_prefix = enabled;
        self
    }

    /// The API shape applied where no matcher overrides it.
    pub fn default_api_level(&mut self, level: ApiLevel) -> &mut Config {
        self.default_api_level = level;
        self
    }

    /// Overrides the API shape for messages matched by `matcher`, using the
    /// same path-matching rules as the other policy matchers: a matcher of
    /// `.package.Message` or a `.suffix` both work.
    pub fn api_level<M: Into<String>>(&mut self, matcher: M, level: ApiLevel) -> &mut Config {
        self.api_levels.push((matcher.into(), level));
        self
    }

    /// Enables legacy JSON decode support for matched enums.
    pub fn legacy_json<M: Into<String>>(&mut self, matcher: M) -> &mut Config {
        self.legacy_json.push(matcher.into());
        self
    }

    /// Emits the deprecated raw-descriptor accessors for matched types.
    pub fn raw_descriptors<M: Into<String>>(&mut self, matcher: M) -> &mut Config {
        self.raw_descriptors.push(matcher.into());
        self
    }

    /// Annotates every field of matched messages with field-tracking
    /// metadata, on struct fields, oneof slots, and oneof variants alike.
    pub fn field_tracking<M: Into<String>>(&mut self, matcher: M) -> &mut Config {
        self.field_tracking.push(matcher.into());
        self
    }

    /// Records the schema compiler version printed in generated headers.
    pub fn compiler_version<V: Into<String>>(&mut self, version: V) -> &mut Config {
        self.compiler_version = Some(version.into());
        self
    }

    pub(crate) fn api_level_for(&self, fq_name: &str) -> ApiLevel {
        self.api_levels
            .iter()
            .find(|(matcher, _)| ident::match_ident(matcher, fq_name, None))
            .map(|(_, level)| *level)
            .unwrap_or(self.default_api_level)
    }

    pub(crate) fn legacy_json_for(&self, fq_name: &str) -> bool {
        self.legacy_json
            .iter()
            .any(|matcher| ident::match_ident(matcher, fq_name, None))
    }

    pub(crate) fn raw_descriptors_for(&self, fq_name: &str) -> bool {
        self.raw_descriptors
            .iter()
            .any(|matcher| ident::match_ident(matcher, fq_name, None))
    }

    pub(crate) fn field_tracking_for(&self, fq_name: &str) -> bool {
        self.field_tracking
            .iter()
            .any(|matcher| ident::match_ident(matcher, fq_name, None))
    }
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    /// Output path: the schema path with `.proto` replaced by `.rs` (plus
    /// the `_protoopaque` marker on the second variant of a hybrid file).
    pub name: String,
    pub content: String,
}

/// The result of a generation run: the files that generated successfully,
/// and the collaborator failures accumulated along the way.
#[derive(Debug, Default)]
pub struct Outputs {
    pub files: Vec<GeneratedFile>,
    pub errors: Vec<Error>,
}

/// Drives generation over a set of input descriptors.
pub struct Generator {
    config: Config,
    files: HashMap<String, FileDescriptorProto>,
}

impl Generator {
    pub fn new(config: Config, files: Vec<FileDescriptorProto>) -> Generator {
        let files = files
            .into_iter()
            .map(|file| (file.name().to_string(), file))
            .collect();
        Generator { config, files }
    }

    /// Generates the requested files. Collaborator failures (missing inputs,
    /// unparseable dependency output) fail only the affected file and are
    /// reported in [`Outputs::errors`]; an internal consistency error aborts
    /// the run.
    pub fn generate(&self, requested: &[&str]) -> Result<Outputs, Error> {
        let type_map = TypeMap::build(self.files.values(), &self.config);

        let mut run = Run {
            generator: self,
            type_map,
            cache: HashMap::new(),
            visiting: HashSet::new(),
            errors: Vec::new(),
        };

        let mut outputs = Outputs::default();
        for &path in requested {
            if run.ensure_generated(path)? {
                let cached = run.cache[path]
                    .as_ref()
                    .expect("cache entry for successful file");
                outputs.files.extend(cached.files.iter().cloned());
            }
        }
        info!(
            "generated {} files, {} errors",
            outputs.files.len(),
            run.errors.len()
        );
        outputs.errors = run.errors;
        Ok(outputs)
    }
}

struct CachedFile {
    files: Vec<GeneratedFile>,
    package: String,
    descriptor_ident: String,
}

impl CachedFile {
    /// The primary-variant text, which public-import forwarding parses.
    fn primary_text(&self) -> &str {
        &self.files[0].content
    }
}

struct Run<'a> {
    generator: &'a Generator,
    type_map: TypeMap,
    /// Per-file outcome; `None` marks a file whose generation failed.
    cache: HashMap<String, Option<CachedFile>>,
    visiting: HashSet<String>,
    errors: Vec<Error>,
}

impl Run<'_> {
    /// Generates `path` and its public-import closure, depth first. Returns
    /// whether the file is usable; `Err` only for internal errors.
    fn ensure_generated(&mut self, path: &str) -> Result<bool, Error> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(cached.is_some());
        }
        if !self.visiting.insert(path.to_string()) {
            return Err(Error::Internal(format!(
                "public import cycle through {}",
                path
            )));
        }
        let result = self.generate_file(path);
        self.visiting.remove(path);
        match result {
            Ok(cached) => {
                self.cache.insert(path.to_string(), Some(cached));
                Ok(true)
            }
            Err(Error::Internal(message)) => Err(Error::Internal(message)),
            Err(error) => {
                self.errors.push(error);
                self.cache.insert(path.to_string(), None);
                Ok(false)
            }
        }
    }

    fn generate_file(&mut self, path: &str) -> Result<CachedFile, Error> {
        let generator = self.generator;
        let desc = generator
            .files
            .get(path)
            .ok_or_else(|| Error::MissingFile(path.to_string()))?;
        let config = &generator.config;
        let mut model = FileModel::build(desc, config);
        debug!("generate_file: {} ({:?})", path, model.api_level);

        // Public imports must exist before their symbols can be forwarded.
        let mut forwards = Vec::new();
        let public_imports: Vec<String> = model
            .imports
            .iter()
            .filter(|import| import.public)
            .map(|import| import.path.clone())
            .collect();
        for import in &public_imports {
            if !self.ensure_generated(import)? {
                return Err(Error::MissingFile(import.clone()));
            }
            let dep = self.cache[import]
                .as_ref()
                .expect("cache entry for generated import");
            let module = relative_module(&model.package, &dep.package);
            if module.is_empty() {
                // Same package means same module; nothing to forward.
                continue;
            }
            let block =
                forward_block(dep.primary_text(), import, &module, &dep.descriptor_ident)?;
            forwards.push(block);
        }

        // The raw descriptor embeds everything except the location table.
        let mut stripped = desc.clone();
        stripped.source_code_info = None;
        let raw_desc = stripped.encode_to_vec();

        let hybrid = model.api_level == ApiLevel::Hybrid;
        let base = path.strip_suffix(".proto").unwrap_or(path);
        let mut files = Vec::new();

        let primary_variant = if hybrid { Variant::HybridOpen } else { Variant::Only };
        let mut content = String::new();
        CodeGenerator::generate(
            config,
            &self.type_map,
            &model,
            &raw_desc,
            &forwards,
            primary_variant,
            &mut content,
        );
        files.push(GeneratedFile {
            name: format!("{}.rs", base),
            content,
        });

        if hybrid {
            // The promotion pass runs to completion before the second
            // variant starts; the two emissions never interleave.
            model.promote_to_opaque();
            let mut content = String::new();
            CodeGenerator::generate(
                config,
                &self.type_map,
                &model,
                &raw_desc,
                &forwards,
                Variant::HybridOpaque,
                &mut content,
            );
            files.push(GeneratedFile {
                name: format!("{}_protoopaque.rs", base),
                content,
            });
        }

        Ok(CachedFile {
            files,
            package: model.package,
            descriptor_ident: model.descriptor_ident,
        })
    }
}
