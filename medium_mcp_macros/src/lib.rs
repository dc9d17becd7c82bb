//! `#[derive(ToolArguments)]`: derives a JSON input schema for a tool's
//! argument struct.
//!
//! Field attributes (`#[tool_arg(...)]`):
//! - `desc = "..."`: schema `description`.
//! - `rename = "..."`: property name in the schema. Keep it in sync with any
//!   `#[serde(rename)]` on the same field.
//! - `skip`: leave the field out of the schema.
//! - `required = bool`: override the default (`Option<T>` is optional).
//! - `min_len = N`: `minLength` for strings, `minItems` for arrays.

extern crate proc_macro;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{
    parse_macro_input, Data, DeriveInput, Field, Fields, Ident, LitBool, LitInt, LitStr, Meta,
    Result as SynResult, Token, Type,
};

#[derive(Default, Debug)]
struct FieldArgs {
    desc: Option<String>,
    rename: Option<String>,
    skip: bool,
    required: Option<bool>,
    min_len: Option<u64>,
}

impl Parse for FieldArgs {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let mut args = FieldArgs::default();
        while !input.is_empty() {
            let key: Ident = input.call(Ident::parse_any)?;

            if key == "desc" {
                input.parse::<Token![=]>()?;
                args.desc = Some(input.parse::<LitStr>()?.value());
            } else if key == "rename" {
                input.parse::<Token![=]>()?;
                args.rename = Some(input.parse::<LitStr>()?.value());
            } else if key == "skip" {
                if input.peek(Token![=]) {
                    input.parse::<Token![=]>()?;
                    args.skip = input.parse::<LitBool>()?.value;
                } else {
                    args.skip = true;
                }
            } else if key == "required" {
                input.parse::<Token![=]>()?;
                args.required = Some(input.parse::<LitBool>()?.value());
            } else if key == "min_len" {
                input.parse::<Token![=]>()?;
                args.min_len = Some(input.parse::<LitInt>()?.base10_parse::<u64>()?);
            } else {
                return Err(syn::Error::new(
                    key.span(),
                    format!("unknown tool_arg attribute key: {}", key),
                ));
            }

            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

fn parse_field_attributes(field: &Field) -> SynResult<FieldArgs> {
    let mut aggregated = FieldArgs::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("tool_arg") {
            continue;
        }
        let Meta::List(meta_list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                attr.meta.to_token_stream(),
                "Expected #[tool_arg(key = value, ...)] format for tool_arg attribute",
            ));
        };
        let parsed = meta_list.parse_args::<FieldArgs>()?;
        if parsed.desc.is_some() {
            aggregated.desc = parsed.desc;
        }
        if parsed.rename.is_some() {
            aggregated.rename = parsed.rename;
        }
        if parsed.skip {
            aggregated.skip = true;
        }
        if parsed.required.is_some() {
            aggregated.required = parsed.required;
        }
        if parsed.min_len.is_some() {
            aggregated.min_len = parsed.min_len;
        }
    }
    Ok(aggregated)
}

/// Returns the `T` in `Wrapper<T>` when the single-segment path is `wrapper`.
fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    if type_path.qself.is_some() || type_path.path.segments.len() != 1 {
        return None;
    }
    let segment = &type_path.path.segments[0];
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(angle_args) => match angle_args.args.first() {
            Some(syn::GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn is_option(ty: &Type) -> bool {
    generic_inner(ty, "Option").is_some()
}

/// Strips one level of `Option` so length limits apply to the wrapped value.
fn unwrap_option(ty: &Type) -> &Type {
    generic_inner(ty, "Option").unwrap_or(ty)
}

fn is_string(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.qself.is_none() && p.path.is_ident("String"))
}

fn type_to_schema(ty: &Type, struct_name: &Ident) -> TokenStream2 {
    if let Some(inner) = generic_inner(ty, "Option") {
        return type_to_schema(inner, struct_name);
    }
    if let Some(inner) = generic_inner(ty, "Vec") {
        let items_schema = type_to_schema(inner, struct_name);
        return quote! { ::serde_json::json!({ "type": "array", "items": #items_schema }) };
    }

    let Type::Path(type_path) = ty else {
        let error_msg = format!(
            "Unsupported field type for ToolArguments schema generation: {}",
            ty.to_token_stream()
        );
        return quote! { compile_error!(#error_msg) };
    };
    if type_path.qself.is_some() {
        return quote! { compile_error!("Unsupported qualified type path (e.g. <T as Trait>::Type)") };
    }

    let path = &type_path.path;
    let is_any = |names: &[&str]| names.iter().any(|n| path.is_ident(n));
    if is_any(&["String"]) {
        quote! { ::serde_json::json!({ "type": "string" }) }
    } else if is_any(&[
        "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize",
    ]) {
        quote! { ::serde_json::json!({ "type": "integer" }) }
    } else if is_any(&["f32", "f64"]) {
        quote! { ::serde_json::json!({ "type": "number" }) }
    } else if is_any(&["bool"]) {
        quote! { ::serde_json::json!({ "type": "boolean" }) }
    } else if path.is_ident(struct_name) {
        let type_name = struct_name.to_string();
        quote! { compile_error!(concat!("Recursive type definition for schema not supported directly for type: ", #type_name)) }
    } else {
        quote! { <#path as ::medium_mcp::ToolArgumentsDescriptor>::input_schema() }
    }
}

/// Emits the length keyword matching the field's type, or an error for types
/// that have no length.
fn length_constraint(ty: &Type, min_len: u64) -> SynResult<(&'static str, u64)> {
    let inner = unwrap_option(ty);
    if is_string(inner) {
        Ok(("minLength", min_len))
    } else if generic_inner(inner, "Vec").is_some() {
        Ok(("minItems", min_len))
    } else {
        Err(syn::Error::new_spanned(
            ty,
            "min_len is only supported on String and Vec fields",
        ))
    }
}

#[proc_macro_derive(ToolArguments, attributes(tool_arg))]
pub fn tool_arguments_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named_fields) => named_fields.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return TokenStream::from(quote! {
                    compile_error!("ToolArguments can only be derived for structs with named fields.");
                });
            }
        },
        _ => {
            return TokenStream::from(quote! {
                compile_error!("ToolArguments can only be derived for structs.");
            });
        }
    };

    let mut property_inserts = Vec::new();
    let mut required_field_names = Vec::new();
    let mut compile_errors = TokenStream2::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;

        let field_attrs = match parse_field_attributes(field) {
            Ok(attrs) => attrs,
            Err(err) => {
                compile_errors.extend(err.to_compile_error());
                continue;
            }
        };
        if field_attrs.skip {
            continue;
        }

        let property_name = field_attrs
            .rename
            .clone()
            .unwrap_or_else(|| field_ident.to_string());
        let base_schema = type_to_schema(field_type, name);

        let mut extra_keys = Vec::new();
        if let Some(desc) = &field_attrs.desc {
            extra_keys.push(quote! {
                obj.insert("description".to_string(), ::serde_json::json!(#desc));
            });
        }
        if let Some(min_len) = field_attrs.min_len {
            match length_constraint(field_type, min_len) {
                Ok((keyword, value)) => extra_keys.push(quote! {
                    obj.insert(#keyword.to_string(), ::serde_json::json!(#value));
                }),
                Err(err) => compile_errors.extend(err.to_compile_error()),
            }
        }

        property_inserts.push(quote! {
            map.insert(#property_name.to_string(), {
                let mut schema = #base_schema;
                if let Some(obj) = schema.as_object_mut() {
                    #(#extra_keys)*
                }
                schema
            });
        });

        if field_attrs.required.unwrap_or(!is_option(field_type)) {
            required_field_names.push(quote! { #property_name });
        }
    }

    if !compile_errors.is_empty() {
        return TokenStream::from(compile_errors);
    }

    let expanded = quote! {
        impl ::medium_mcp::ToolArgumentsDescriptor for #name {
            fn input_schema() -> ::serde_json::Value {
                static SCHEMA: ::once_cell::sync::Lazy<::serde_json::Value> = ::once_cell::sync::Lazy::new(|| {
                    #[allow(unused_mut)]
                    let mut map = ::serde_json::Map::new();
                    #(#property_inserts)*

                    let mut schema_obj = ::serde_json::Map::new();
                    schema_obj.insert("type".to_string(), ::serde_json::json!("object"));
                    schema_obj.insert("properties".to_string(), ::serde_json::Value::Object(map));

                    let required: &[&str] = &[ #(#required_field_names),* ];
                    if !required.is_empty() {
                        schema_obj.insert("required".to_string(), ::serde_json::json!(required));
                    }
                    ::serde_json::Value::Object(schema_obj)
                });
                SCHEMA.clone()
            }
        }
    };

    TokenStream::from(expanded)
}
