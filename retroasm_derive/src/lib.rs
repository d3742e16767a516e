//! Derive macros for retroasm.
extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{ToTokens, quote};

/// Derives `crate::parser::Parse` for an enum of unit variants. Each variant is recognized by its lowercased name,
/// which is how mnemonic, register and condition tables map identifier text to back end enums.
#[proc_macro_derive(Parse)]
pub fn parse_macro_derive(input: TokenStream) -> TokenStream {
	let type_ = syn::parse_macro_input!(input as syn::DeriveInput);

	match type_.data {
		syn::Data::Enum(enum_) => {
			let name = type_.ident;
			let name_string = name.to_string().to_lowercase();
			let variant_identifiers_and_strings = enum_
				.variants
				.iter()
				.map(|variant| match variant.fields {
					syn::Fields::Unit => (variant.ident.clone(), variant.ident.to_string().to_lowercase()),
					_ => panic!(
						"Parse cannot be derived for enums containing non-unit variants; variant {} is not a unit.",
						variant.to_token_stream()
					),
				})
				.collect::<Vec<(syn::Ident, String)>>();
			let variant_identifiers = variant_identifiers_and_strings.iter().map(|(identifier, _)| identifier);
			let variant_strings = variant_identifiers_and_strings.iter().map(|(_, string)| string);
			let valid_strings = variant_identifiers_and_strings.iter().map(|(_, string)| string);

			quote! {
				#[automatically_derived]
				#[allow(missing_docs)]
				impl crate::parser::Parse for #name {
					fn parse(
						value: &str,
						location: ::miette::SourceSpan,
						src: ::std::sync::Arc<crate::AssemblyCode>,
					) -> ::std::result::Result<Self, ::std::boxed::Box<crate::AssemblyError>> {
						Ok(match value {
							#( #variant_strings => Self::#variant_identifiers, )*
							_ => return Err(::std::boxed::Box::new(crate::AssemblyError::InvalidConstant {
								constant: value.to_owned(),
								typename: #name_string.to_owned(),
								location,
								src,
							})),
						})
					}

					fn is_valid(value: &str) -> bool {
						matches!(value, #( #valid_strings )|*)
					}
				}
			}
			.into()
		},
		_ => panic!("Parse cannot be derived for non-enum types."),
	}
}

/// Derives `crate::VariantName`, returning the variant identifier as written in the source.
#[proc_macro_derive(VariantName)]
pub fn variant_name_derive(input: TokenStream) -> TokenStream {
	let type_ = syn::parse_macro_input!(input as syn::DeriveInput);

	match type_.data {
		syn::Data::Enum(enum_) => {
			let name = type_.ident;
			let (impl_generics, type_generics, where_clause) = type_.generics.split_for_impl();
			let identifiers = enum_.variants.iter().map(|variant| &variant.ident).collect::<Vec<_>>();
			let strings = identifiers.iter().map(ToString::to_string);

			quote! {
				#[automatically_derived]
				impl #impl_generics crate::VariantName for #name #type_generics #where_clause {
					fn variant_name(&self) -> &'static str {
						match self {
							#( Self::#identifiers { .. } => #strings, )*
						}
					}
				}
			}
			.into()
		},
		_ => panic!("VariantName cannot be derived for non-enum types."),
	}
}
