use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

mod attrs;

use attrs::{parse_container_attrs, parse_field_attrs};

/// Derive macro for the `Entity` trait.
///
/// Generates the type tag and a `fields()` method that converts every field
/// with `ToValue`, in declaration order.
///
/// # Example
///
/// ```ignore
/// use chelate_core::{Entity, Node};
///
/// #[derive(Entity)]
/// #[entity(tag = "User")]
/// struct User {
///     id: u32,
///     #[entity(rename = "displayName")]
///     display_name: String,
///     #[entity(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[entity(tag = "name")]` - Type tag (defaults to the type's name)
/// - `#[entity(skip)]` - Leave this field out
/// - `#[entity(rename = "name")]` - Use a custom field name
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_entity_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_entity_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let container = parse_container_attrs(&input.attrs)?;
    let tag = container.tag.unwrap_or_else(|| name.to_string());

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let where_clause = build_where_clause(&input.generics, where_clause);

    let fields_impl = generate_fields(input)?;

    Ok(quote! {
        impl #impl_generics ::chelate_core::Entity for #name #ty_generics #where_clause {
            const TAG: &'static str = #tag;

            fn fields(&self) -> ::chelate_core::Fields {
                #fields_impl
            }
        }
    })
}

fn build_where_clause(
    generics: &syn::Generics,
    existing: Option<&syn::WhereClause>,
) -> proc_macro2::TokenStream {
    let type_params: Vec<_> = generics.type_params().map(|p| &p.ident).collect();

    if type_params.is_empty() && existing.is_none() {
        return quote! {};
    }

    let bounds = type_params.iter().map(|p| {
        quote! { #p: ::chelate_core::ToValue }
    });

    let existing_predicates = existing
        .map(|w| {
            let predicates = &w.predicates;
            quote! { #predicates, }
        })
        .unwrap_or_default();

    quote! {
        where
            #existing_predicates
            #(#bounds),*
    }
}

fn generate_fields(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let data = match &input.data {
        syn::Data::Struct(data) => data,
        syn::Data::Enum(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Entity cannot be derived for enums",
            ));
        }
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Entity cannot be derived for unions",
            ));
        }
    };

    match &data.fields {
        syn::Fields::Named(named) => {
            let mut inserts = Vec::with_capacity(named.named.len());
            for field in &named.named {
                let attrs = parse_field_attrs(&field.attrs)?;
                if attrs.skip {
                    continue;
                }
                let Some(ident) = field.ident.as_ref() else {
                    continue;
                };
                let key = attrs.rename.unwrap_or_else(|| unraw(ident));
                inserts.push(quote! {
                    fields.insert(
                        ::std::string::String::from(#key),
                        ::chelate_core::ToValue::to_value(&self.#ident),
                    );
                });
            }
            Ok(quote! {
                #[allow(unused_mut)]
                let mut fields = ::chelate_core::Fields::new();
                #(#inserts)*
                fields
            })
        }
        syn::Fields::Unit => Ok(quote! { ::chelate_core::Fields::new() }),
        syn::Fields::Unnamed(_) => Err(syn::Error::new_spanned(
            input,
            "Entity requires named fields",
        )),
    }
}

/// Field name without a raw identifier prefix (`r#type` -> `type`).
fn unraw(ident: &syn::Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}
