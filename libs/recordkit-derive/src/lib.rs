use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// Derive macro for record types.
///
/// Implements `recordkit::RecordType`: the record type name, the field schema
/// and the per-field encode/decode calls.
///
/// # Example
///
/// ```ignore
/// #[derive(RecordType)]
/// #[record(type_name = "Person", rename_all = "camelCase")]
/// pub struct Person {
///     pub name: String,
///     pub is_developer: bool,
///
///     #[record(identifier)]
///     pub id: String,
///
///     #[record(system_fields)]
///     pub system_fields: Option<Bytes>,
///
///     #[record(skip)]
///     pub cached: Vec<String>,
/// }
/// ```
///
/// Container attributes: `type_name` (defaults to the struct name) and
/// `rename_all = "camelCase"`. Field attributes: `rename = "..."`,
/// `identifier`, `system_fields` and `skip` (filled with `Default::default()`
/// on decode).
#[proc_macro_derive(RecordType, attributes(record))]
pub fn derive_record_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record_type_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive macro for enums stored as raw values.
///
/// Implements `recordkit::EnumMapping` and `recordkit::field::RecordField`
/// for a fieldless enum.
///
/// # Example
///
/// ```ignore
/// #[derive(RecordEnum)]
/// enum Status {
///     #[record(fallback)]
///     Unknown,
///     #[record(rename = "in-progress")]
///     InProgress,
///     Done,
/// }
///
/// #[derive(RecordEnum)]
/// #[record(repr = "int")]
/// enum Level {
///     Low = 1,
///     High = 10,
/// }
/// ```
///
/// String raw values default to the variant name. With `repr = "int"` the
/// raw value is the variant's discriminant.
#[proc_macro_derive(RecordEnum, attributes(record))]
pub fn derive_record_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record_enum_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn record_type_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "RecordType only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "RecordType only supports structs")),
    };

    // Parse #[record(...)] on the struct.
    let mut type_name: Option<String> = None;
    let mut camel_case = false;
    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type_name") {
                let value: LitStr = meta.value()?.parse()?;
                type_name = Some(value.value());
            } else if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value() != "camelCase" {
                    return Err(meta.error("only rename_all = \"camelCase\" is supported"));
                }
                camel_case = true;
            } else {
                return Err(meta.error("unknown record attribute"));
            }
            Ok(())
        })?;
    }
    let type_name = type_name.unwrap_or_else(|| name.to_string());

    let mut schema_tokens = Vec::new();
    let mut encode_tokens = Vec::new();
    let mut decode_tokens = Vec::new();
    let mut seen_system_fields = false;
    let mut seen_identifier = false;

    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_ty = &field.ty;

        // Parse #[record(...)] on the field.
        let mut rename: Option<String> = None;
        let mut system_fields = false;
        let mut identifier = false;
        let mut skip = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("record") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    rename = Some(value.value());
                } else if meta.path.is_ident("system_fields") {
                    system_fields = true;
                } else if meta.path.is_ident("identifier") {
                    identifier = true;
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else {
                    return Err(meta.error("unknown record attribute"));
                }
                Ok(())
            })?;
        }

        if [rename.is_some(), system_fields, identifier, skip]
            .iter()
            .filter(|set| **set)
            .count()
            > 1
        {
            return Err(syn::Error::new_spanned(
                field_name,
                "rename, system_fields, identifier and skip are mutually exclusive",
            ));
        }

        if skip {
            decode_tokens.push(quote! {
                #field_name: ::core::default::Default::default()
            });
            continue;
        }

        let key = if system_fields {
            if seen_system_fields {
                return Err(syn::Error::new_spanned(field_name, "duplicate system_fields field"));
            }
            seen_system_fields = true;
            quote! { ::recordkit::SYSTEM_FIELDS_KEY }
        } else if identifier {
            if seen_identifier {
                return Err(syn::Error::new_spanned(field_name, "duplicate identifier field"));
            }
            seen_identifier = true;
            quote! { ::recordkit::IDENTIFIER_KEY }
        } else {
            let key = match rename {
                Some(key) => key,
                None if camel_case => to_camel_case(&field_name.to_string()),
                None => field_name.to_string(),
            };
            quote! { #key }
        };

        schema_tokens.push(quote! {
            ::recordkit::schema::FieldSchema {
                name: #key,
                declared: <#field_ty as ::recordkit::field::RecordField>::DECLARED,
                optional: <#field_ty as ::recordkit::field::RecordField>::OPTIONAL,
            }
        });
        encode_tokens.push(quote! {
            __encoder.field(#key, &self.#field_name)?;
        });
        decode_tokens.push(quote! {
            #field_name: __decoder.field::<#field_ty>(#key)?
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::recordkit::schema::RecordType for #name #ty_generics #where_clause {
            const RECORD_TYPE: &'static str = #type_name;

            fn schema() -> ::std::vec::Vec<::recordkit::schema::FieldSchema> {
                ::std::vec![
                    #(#schema_tokens),*
                ]
            }

            fn encode_fields(
                &self,
                __encoder: &mut ::recordkit::encoder::FieldEncoder<'_>,
            ) -> ::core::result::Result<(), ::recordkit::error::CodecError> {
                #(#encode_tokens)*
                ::core::result::Result::Ok(())
            }

            fn decode_fields(
                __decoder: &::recordkit::decoder::FieldDecoder<'_>,
            ) -> ::core::result::Result<Self, ::recordkit::error::CodecError> {
                ::core::result::Result::Ok(Self {
                    #(#decode_tokens),*
                })
            }
        }
    })
}

fn record_enum_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => return Err(syn::Error::new_spanned(name, "RecordEnum only supports enums")),
    };

    let mut int_repr = false;
    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("repr") {
                let value: LitStr = meta.value()?.parse()?;
                match value.value().as_str() {
                    "string" => int_repr = false,
                    "int" => int_repr = true,
                    other => {
                        return Err(meta.error(format!(
                            "unknown repr '{other}' (expected 'string' or 'int')"
                        )))
                    }
                }
            } else {
                return Err(meta.error("unknown record attribute"));
            }
            Ok(())
        })?;
    }

    let mut fallback: Option<&syn::Ident> = None;
    let mut idents = Vec::new();
    let mut raw_names = Vec::new();

    for variant in variants {
        let ident = &variant.ident;
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "RecordEnum only supports unit variants",
            ));
        }

        let mut rename: Option<String> = None;
        for attr in &variant.attrs {
            if !attr.path().is_ident("record") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    rename = Some(value.value());
                } else if meta.path.is_ident("fallback") {
                    if fallback.is_some() {
                        return Err(meta.error("only one variant can be the fallback"));
                    }
                    fallback = Some(ident);
                } else {
                    return Err(meta.error("unknown record attribute"));
                }
                Ok(())
            })?;
        }

        if int_repr && rename.is_some() {
            return Err(syn::Error::new_spanned(
                ident,
                "rename has no effect with repr = \"int\"",
            ));
        }

        idents.push(ident);
        raw_names.push(rename.unwrap_or_else(|| ident.to_string()));
    }

    let fallback_expr = match fallback {
        Some(ident) => quote! { ::core::option::Option::Some(Self::#ident) },
        None => quote! { ::core::option::Option::None },
    };

    let mapping = if int_repr {
        quote! {
            type Raw = i64;

            fn raw_value(&self) -> i64 {
                match self {
                    #(Self::#idents => Self::#idents as i64,)*
                }
            }

            fn from_raw_value(raw: &i64) -> ::core::option::Option<Self> {
                #(
                    if *raw == Self::#idents as i64 {
                        return ::core::option::Option::Some(Self::#idents);
                    }
                )*
                ::core::option::Option::None
            }
        }
    } else {
        quote! {
            type Raw = ::std::string::String;

            fn raw_value(&self) -> ::std::string::String {
                match self {
                    #(Self::#idents => ::std::string::String::from(#raw_names),)*
                }
            }

            fn from_raw_value(raw: &::std::string::String) -> ::core::option::Option<Self> {
                match raw.as_str() {
                    #(#raw_names => ::core::option::Option::Some(Self::#idents),)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    };

    Ok(quote! {
        impl ::recordkit::enum_mapping::EnumMapping for #name {
            #mapping

            fn fallback_case() -> ::core::option::Option<Self> {
                #fallback_expr
            }
        }

        ::recordkit::enum_field!(#name);
    })
}

/// `is_developer` -> `isDeveloper`.
fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.trim_start_matches('_').chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::to_camel_case;

    #[test]
    fn camel_case() {
        assert_eq!(to_camel_case("is_developer"), "isDeveloper");
        assert_eq!(to_camel_case("name"), "name");
        assert_eq!(to_camel_case("avatar_url_2"), "avatarUrl2");
    }
}
