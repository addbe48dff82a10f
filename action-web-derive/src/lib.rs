mod attributes;
mod context;
mod controller;

use crate::attributes::ControllerAttributes;
use crate::context::expand_controller_context;
use crate::controller::generate_controller;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Error, Item};

/// Implements `Controller` by giving access to the field holding the `ActionContext`.
#[proc_macro_derive(Controller, attributes(action_context))]
pub fn derive_controller(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_controller_context(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Declares all methods of an impl block as controller methods and registers the controller.
#[proc_macro_attribute]
pub fn controller(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as ControllerAttributes);
    let item = parse_macro_input!(input as Item);
    let controller = generate_controller(&item, &args).unwrap_or_else(Error::into_compile_error);

    (quote! {
        #item

        #controller
    })
    .into()
}
