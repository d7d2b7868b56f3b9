//! Proc macros for structured model outputs.
//!
//! Provides `#[derive(StructuredOutput)]`, which implements
//! `claude::StructuredOutput` for a struct: the JSON schema comes from the
//! field types, descriptions come from doc comments.
//!
//! # Example
//!
//! ```ignore
//! /// Pick up to two Pokemon named in the message
//! #[derive(StructuredOutput, Deserialize)]
//! #[output(name = "extract_names")]
//! struct ExtractNames {
//!     /// Names in mention order
//!     #[output(max_items = 2)]
//!     names: Vec<String>,
//!     /// Free-text note
//!     #[output(optional)]
//!     note: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, Lit, LitInt, LitStr, Meta, Type};

/// Derive macro implementing `claude::StructuredOutput`.
///
/// # Attributes
///
/// - `#[output(name = "...")]` on the struct - Override the output name (defaults to snake_case struct name)
/// - `#[output(optional)]` on fields - Leave the field out of `required`
/// - `#[output(rename = "...")]` on fields - Override the property name
/// - `#[output(max_items = N)]` on `Vec` fields - Add `maxItems` to the schema
///
/// Fields whose type is not a primitive, `String`, `Option<T>` or `Vec<T>`
/// must themselves implement `claude::StructuredOutput`; their schema is
/// inlined.
#[proc_macro_derive(StructuredOutput, attributes(output))]
pub fn derive_structured_output(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

#[derive(Default)]
struct FieldOptions {
    optional: bool,
    rename: Option<String>,
    max_items: Option<u64>,
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let output_name = get_output_name(&input)?;
    let description = get_doc_comment(&input.attrs);

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "StructuredOutput derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "StructuredOutput derive only supports structs",
            ))
        }
    };

    let mut property_tokens = Vec::new();
    let mut required_fields = Vec::new();

    for field in fields {
        let options = get_field_options(field)?;
        let property_name = match &options.rename {
            Some(name) => name.clone(),
            None => field_ident_name(field)?,
        };
        let field_desc = get_doc_comment(&field.attrs);
        let type_schema = type_to_schema(&field.ty);

        let desc_token = if field_desc.is_empty() {
            quote! {}
        } else {
            quote! { property["description"] = serde_json::json!(#field_desc); }
        };

        let max_items_token = match options.max_items {
            Some(max) => quote! { property["maxItems"] = serde_json::json!(#max); },
            None => quote! {},
        };

        property_tokens.push(quote! {
            {
                let mut property = #type_schema;
                #desc_token
                #max_items_token
                properties.insert(#property_name.to_string(), property);
            }
        });

        if !options.optional && !is_option_type(&field.ty) {
            required_fields.push(property_name);
        }
    }

    let required_array: Vec<_> = required_fields.iter().map(|s| quote! { #s }).collect();

    Ok(quote! {
        impl claude::StructuredOutput for #struct_name {
            fn output_name() -> &'static str {
                #output_name
            }

            fn output_description() -> &'static str {
                #description
            }

            fn input_schema() -> serde_json::Value {
                let mut properties = serde_json::Map::new();
                #(#property_tokens)*

                let required: Vec<&str> = vec![#(#required_array),*];

                serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required
                })
            }
        }
    })
}

fn get_output_name(input: &DeriveInput) -> syn::Result<String> {
    let mut name = None;
    for attr in &input.attrs {
        if attr.path().is_ident("output") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported struct attribute, expected `name`"))
                }
            })?;
        }
    }

    Ok(name.unwrap_or_else(|| to_snake_case(&input.ident.to_string())))
}

fn get_field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in &field.attrs {
        if attr.path().is_ident("output") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("optional") {
                    options.optional = true;
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    options.rename = Some(value.value());
                    Ok(())
                } else if meta.path.is_ident("max_items") {
                    let value: LitInt = meta.value()?.parse()?;
                    options.max_items = Some(value.base10_parse()?);
                    Ok(())
                } else {
                    Err(meta.error(
                        "unsupported field attribute, expected `optional`, `rename` or `max_items`",
                    ))
                }
            })?;
        }
    }
    Ok(options)
}

fn field_ident_name(field: &Field) -> syn::Result<String> {
    field
        .ident
        .as_ref()
        .map(|ident| ident.to_string().trim_start_matches("r#").to_string())
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))
}

fn get_doc_comment(attrs: &[syn::Attribute]) -> String {
    let mut docs = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("doc") {
            if let Meta::NameValue(nv) = &attr.meta {
                if let syn::Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Str(s) = &expr_lit.lit {
                        let line = s.value().trim().to_string();
                        if !line.is_empty() {
                            docs.push(line);
                        }
                    }
                }
            }
        }
    }
    docs.join(" ")
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

fn first_generic(segment: &syn::PathSegment) -> Option<&Type> {
    if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
            return Some(inner);
        }
    }
    None
}

fn type_to_schema(ty: &Type) -> TokenStream2 {
    let Type::Path(type_path) = ty else {
        return quote! { serde_json::json!({}) };
    };
    let Some(segment) = type_path.path.segments.last() else {
        return quote! { serde_json::json!({}) };
    };

    match segment.ident.to_string().as_str() {
        "String" | "str" => quote! { serde_json::json!({"type": "string"}) },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { serde_json::json!({"type": "integer"}) }
        }
        "f32" | "f64" => quote! { serde_json::json!({"type": "number"}) },
        "bool" => quote! { serde_json::json!({"type": "boolean"}) },
        "Option" => match first_generic(segment) {
            Some(inner) => type_to_schema(inner),
            None => quote! { serde_json::json!({}) },
        },
        "Vec" => match first_generic(segment) {
            Some(inner) => {
                let inner_schema = type_to_schema(inner);
                quote! {
                    serde_json::json!({
                        "type": "array",
                        "items": #inner_schema
                    })
                }
            }
            None => quote! { serde_json::json!({"type": "array"}) },
        },
        _ => quote! { <#ty as claude::StructuredOutput>::input_schema() },
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
