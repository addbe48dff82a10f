use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::spanned::Spanned;
use syn::{Data, DataStruct, DeriveInput, Error, Field, Fields, Index, Result};

const ACTION_CONTEXT: &str = "action_context";
const DEFAULT_CONTEXT_FIELD: &str = "context";

fn is_marked(field: &Field) -> bool {
    field
        .attrs
        .iter()
        .any(|attr| attr.path().is_ident(ACTION_CONTEXT))
}

fn member(index: usize, field: &Field) -> TokenStream {
    field
        .ident
        .as_ref()
        .map(|ident| ident.to_token_stream())
        .unwrap_or_else(|| Index::from(index).to_token_stream())
}

fn find_context_member(input: &DeriveInput, fields: &Fields) -> Result<TokenStream> {
    let marked: Vec<_> = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| is_marked(field))
        .collect();

    if let Some((_, second)) = marked.get(1) {
        return Err(Error::new(
            second.span(),
            "Only one field can be marked as action context!",
        ));
    }

    marked
        .first()
        .copied()
        .or_else(|| {
            fields.iter().enumerate().find(|(_, field)| {
                field
                    .ident
                    .as_ref()
                    .map(|ident| ident == DEFAULT_CONTEXT_FIELD)
                    .unwrap_or(false)
            })
        })
        .map(|(index, field)| member(index, field))
        .ok_or_else(|| {
            Error::new(
                input.span(),
                "Missing action context! Name the field `context` or mark it with #[action_context].",
            )
        })
}

pub fn expand_controller_context(input: &DeriveInput) -> Result<TokenStream> {
    if let Data::Struct(DataStruct { fields, .. }) = &input.data {
        let ident = &input.ident;
        let member = find_context_member(input, fields)?;
        let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

        Ok(quote! {
            #[automatically_derived]
            impl #impl_generics action_web::controller::Controller for #ident #ty_generics #where_clause {
                fn action_context(&self) -> &action_web::context::ActionContext {
                    &self.#member
                }

                fn action_context_mut(&mut self) -> &mut action_web::context::ActionContext {
                    &mut self.#member
                }
            }
        })
    } else {
        Err(Error::new(
            input.span(),
            "Can only derive Controller on structs!",
        ))
    }
}
