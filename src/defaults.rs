//! Default-value resolution: the expression a getter returns when a field is
//! unset, and the named constant declarations emitted for explicit schema
//! defaults.

use prost_types::field_descriptor_proto::Type;

use crate::ident::to_upper_camel;
use crate::model::{enum_value_ident, FieldModel, TypeMap};
use crate::Config;

/// A named default declaration for a field with an explicit schema default.
/// Non-literal floating values (NaN and the infinities) have no literal
/// spelling and are declared as statics initialized by runtime math calls;
/// everything else is a plain constant.
#[derive(Debug, PartialEq)]
pub struct DefaultDecl {
    pub ident: String,
    pub ty: String,
    pub expr: String,
    pub is_static: bool,
}

/// The identifier of a field's default constant, e.g. `Default_Widget_Ratio`.
pub fn default_ident(msg_rust_name: &str, field: &FieldModel) -> String {
    format!("Default_{}_{}", msg_rust_name, to_upper_camel(&field.name))
}

/// Builds the default declaration for a field carrying an explicit schema
/// default. Repeated and map fields never have one.
pub fn explicit_default_decl(
    field: &FieldModel,
    msg_rust_name: &str,
    type_map: &TypeMap,
    package: &str,
    config: &Config,
) -> Option<DefaultDecl> {
    if field.repeated {
        return None;
    }
    let default = field.default_value.as_deref()?;
    let ident = default_ident(msg_rust_name, field);

    let (ty, expr, is_static) = match field.kind {
        Type::Bool => ("bool".to_string(), default.to_string(), false),
        Type::String => ("&str".to_string(), str_literal(default), false),
        Type::Bytes => (
            "&[u8]".to_string(),
            bytes_literal(&unescape_c_escape_string(default)),
            false,
        ),
        Type::Float => {
            let (expr, is_static) = float_expr(default, true);
            ("f32".to_string(), expr, is_static)
        }
        Type::Double => {
            let (expr, is_static) = float_expr(default, false);
            ("f64".to_string(), expr, is_static)
        }
        Type::Enum => {
            let entry = type_map.enum_(&field.type_name);
            let ty = type_map.resolve(&field.type_name, package);
            let expr = if entry.package == package {
                enum_value_ident(config, &entry.rust_name, default)
            } else {
                // Named references to foreign enum values are not stable
                // across output units; fall back to construction by number.
                format!("{}({})", ty, entry.number_of(default))
            };
            (ty, expr, false)
        }
        Type::Message | Type::Group => return None,
        _ => (
            crate::types::scalar_type(field.kind).to_string(),
            default.to_string(),
            false,
        ),
    };

    Some(DefaultDecl {
        ident,
        ty,
        expr,
        is_static,
    })
}

/// The expression a getter returns for an unset field with no explicit
/// default. Not meaningful for message, repeated, or map fields, whose
/// getters return absence directly.
pub fn implicit_default_expr(
    field: &FieldModel,
    type_map: &TypeMap,
    package: &str,
) -> String {
    match field.kind {
        Type::Bool => "false".to_string(),
        Type::String => "\"\"".to_string(),
        Type::Bytes => "&[]".to_string(),
        Type::Float | Type::Double => "0.0".to_string(),
        Type::Enum => {
            let entry = type_map.enum_(&field.type_name);
            if entry.package == package {
                entry.first_value_ident.clone()
            } else {
                format!(
                    "{}({})",
                    type_map.resolve(&field.type_name, package),
                    entry.first_value_number
                )
            }
        }
        Type::Message | Type::Group => {
            panic!("message fields have no default expression")
        }
        _ => "0".to_string(),
    }
}

fn float_expr(default: &str, bits32: bool) -> (String, bool) {
    let suffix = if bits32 { "f32" } else { "f64" };
    match default {
        "nan" => (format!("::protogen_runtime::math::nan_{}()", suffix), true),
        "inf" => (
            format!("::protogen_runtime::math::inf_{}(1)", suffix),
            true,
        ),
        "-inf" => (
            format!("::protogen_runtime::math::inf_{}(-1)", suffix),
            true,
        ),
        _ if bits32 => {
            let value: f32 = default
                .parse()
                .unwrap_or_else(|_| panic!("invalid float default: {}", default));
            (format!("{:?}", value), false)
        }
        _ => {
            let value: f64 = default
                .parse()
                .unwrap_or_else(|_| panic!("invalid double default: {}", default));
            (format!("{:?}", value), false)
        }
    }
}

/// Renders a Rust string literal for a default value.
pub fn str_literal(s: &str) -> String {
    let escaped: String = s.chars().flat_map(char::escape_default).collect();
    format!("\"{}\"", escaped)
}

/// Renders a Rust byte-string literal.
pub fn bytes_literal(bytes: &[u8]) -> String {
    let mut lit = String::from("b\"");
    for &b in bytes {
        match b {
            b'\t' => lit.push_str("\\t"),
            b'\r' => lit.push_str("\\r"),
            b'\n' => lit.push_str("\\n"),
            b'"' => lit.push_str("\\\""),
            b'\\' => lit.push_str("\\\\"),
            0x20..=0x7e => lit.push(b as char),
            _ => {
                lit.push_str(&format!("\\x{:02x}", b));
            }
        }
    }
    lit.push('"');
    lit
}

/// Based on [`str::escape_default`], but explicitly handling the C-style
/// escape sequences that byte defaults arrive in.
pub fn unescape_c_escape_string(s: &str) -> Vec<u8> {
    let src = s.as_bytes();
    let len = src.len();
    let mut dst = Vec::new();

    let mut p = 0;

    while p < len {
        if src[p] != b'\\' {
            dst.push(src[p]);
            p += 1;
        } else {
            p += 1;
            if p == len {
                panic!(
                    "invalid c-escaped default binary value ({}): ends with '\\'",
                    s
                )
            }
            match src[p] {
                b'0'..=b'7' => {
                    let mut octal = 0;
                    for _ in 0..3 {
                        if p < len && src[p] >= b'0' && src[p] <= b'7' {
                            octal = octal * 8 + (src[p] - b'0');
                            p += 1;
                        } else {
                            break;
                        }
                    }
                    dst.push(octal);
                }
                b'x' | b'X' => {
                    if p + 3 > len {
                        panic!(
                            "invalid c-escaped default binary value ({}): incomplete hex value",
                            s
                        )
                    }
                    match u8::from_str_radix(&s[p + 1..p + 3], 16) {
                        Ok(b) => dst.push(b),
                        _ => panic!(
                            "invalid c-escaped default binary value ({}): invalid hex value",
                            &s[p..p + 2]
                        ),
                    }
                    p += 3;
                }
                b'a' => {
                    dst.push(0x07);
                    p += 1;
                }
                b'b' => {
                    dst.push(0x08);
                    p += 1;
                }
                b'f' => {
                    dst.push(0x0c);
                    p += 1;
                }
                b'n' => {
                    dst.push(0x0a);
                    p += 1;
                }
                b'r' => {
                    dst.push(0x0d);
                    p += 1;
                }
                b't' => {
                    dst.push(0x09);
                    p += 1;
                }
                b'v' => {
                    dst.push(0x0b);
                    p += 1;
                }
                b'\\' => {
                    dst.push(0x5c);
                    p += 1;
                }
                b'?' => {
                    dst.push(0x3f);
                    p += 1;
                }
                b'\'' => {
                    dst.push(0x27);
                    p += 1;
                }
                b'"' => {
                    dst.push(0x22);
                    p += 1;
                }
                _ => panic!(
                    "invalid c-escaped default binary value ({}): invalid escape",
                    s
                ),
            }
        }
    }
    dst
}
