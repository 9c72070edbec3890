//! Public-import forwarding: re-exports the exported declarations of a
//! publicly imported file so they remain reachable through the importing
//! file's module. The imported file's already-generated text is parsed back
//! with `syn` and each top-level declaration is forwarded by kind.

use log::debug;
use quote::ToTokens;
use syn::{Expr, Item, Type, Visibility};

use crate::Error;

/// Renders the forwarding block for one public import. `dep_module` is the
/// Rust module path from the importing file's module to the imported one.
pub fn forward_block(
    dep_text: &str,
    dep_path: &str,
    dep_module: &str,
    dep_descriptor_ident: &str,
) -> Result<String, Error> {
    let parsed = syn::parse_file(dep_text).map_err(|err| Error::Parse {
        path: dep_path.to_string(),
        message: err.to_string(),
    })?;
    debug!(
        "forwarding {} items from public import {}",
        parsed.items.len(),
        dep_path
    );

    let mut buf = String::new();
    buf.push_str(&format!(
        "// Symbols defined in public import of {}.\n\n",
        dep_path
    ));

    for item in &parsed.items {
        match item {
            // Import plumbing, not declarations.
            Item::Use(_) => {}
            // Method machinery is reachable through the forwarded types.
            Item::Fn(_) | Item::Impl(_) => {}

            Item::Struct(decl) => {
                if is_pub(&decl.vis) && decl.ident != dep_descriptor_ident {
                    buf.push_str(&format!(
                        "pub type {ident} = {dep_module}::{ident};\n",
                        ident = decl.ident,
                    ));
                }
            }
            Item::Enum(decl) => {
                if is_pub(&decl.vis) && decl.ident != dep_descriptor_ident {
                    buf.push_str(&format!(
                        "pub type {ident} = {dep_module}::{ident};\n",
                        ident = decl.ident,
                    ));
                }
            }
            Item::Type(decl) => {
                // A multi-segment alias target is itself a forwarding
                // reference; forwarding it again would chain modules.
                let already_forwarded = matches!(
                    &*decl.ty,
                    Type::Path(path) if path.path.segments.len() > 1
                );
                if is_pub(&decl.vis) && !already_forwarded {
                    buf.push_str(&format!(
                        "pub type {ident} = {dep_module}::{ident};\n",
                        ident = decl.ident,
                    ));
                }
            }
            Item::Const(decl) => {
                if !is_pub(&decl.vis) || decl.ident == "_" {
                    continue;
                }
                let already_forwarded = matches!(
                    &*decl.expr,
                    Expr::Path(path) if path.path.segments.len() > 1
                );
                if already_forwarded {
                    continue;
                }
                // The annotation is re-rendered from the parsed item; local
                // type names in it resolve through the sibling forwards.
                buf.push_str(&format!(
                    "pub const {ident}: {ty} = {dep_module}::{ident};\n",
                    ident = decl.ident,
                    ty = render_type(&decl.ty),
                ));
            }
            Item::Static(decl) => {
                // Statics have no aliasing declaration form; re-export.
                if is_pub(&decl.vis) && decl.ident != dep_descriptor_ident {
                    buf.push_str(&format!(
                        "pub use {dep_module}::{ident};\n",
                        ident = decl.ident,
                    ));
                }
            }

            other => {
                return Err(Error::Internal(format!(
                    "unexpected item kind in generated output of {}: {}",
                    dep_path,
                    item_kind(other),
                )));
            }
        }
    }

    Ok(buf)
}

fn is_pub(vis: &Visibility) -> bool {
    matches!(vis, Visibility::Public(_))
}

/// Renders a parsed type annotation back to source form. Token printing
/// spaces out path separators; tidy the common cases.
fn render_type(ty: &Type) -> String {
    ty.to_token_stream()
        .to_string()
        .replace(" :: ", "::")
        .replace(":: ", "::")
        .replace("& ", "&")
        .replace(" < ", "<")
        .replace(" <", "<")
        .replace(" > ", ">")
        .replace(" >", ">")
        .replace(" ,", ",")
}

fn item_kind(item: &Item) -> &'static str {
    match item {
        Item::ExternCrate(_) => "extern crate",
        Item::ForeignMod(_) => "foreign module",
        Item::Macro(_) => "macro",
        Item::Mod(_) => "module",
        Item::Trait(_) => "trait",
        Item::TraitAlias(_) => "trait alias",
        Item::Union(_) => "union",
        _ => "unknown",
    }
}
