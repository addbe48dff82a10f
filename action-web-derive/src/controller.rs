use crate::attributes::ControllerAttributes;
use convert_case::{Case, Casing};
use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Error, FnArg, ImplItem, ImplItemFn, Item, ItemImpl, Receiver, Result, Type};

const INIT: &str = "init";
const ACTION_PREFIX: &str = "do";

fn receiver(method: &ImplItemFn) -> Option<&Receiver> {
    match method.sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) => Some(receiver),
        _ => None,
    }
}

fn is_declarable(method: &ImplItemFn) -> bool {
    let by_value_receiver = receiver(method)
        .map(|receiver| receiver.reference.is_none())
        .unwrap_or(false);

    !by_value_receiver
        && method.sig.generics.type_params().next().is_none()
        && method.sig.generics.const_params().next().is_none()
}

fn arity(method: &ImplItemFn) -> usize {
    if receiver(method).is_some() {
        method.sig.inputs.len() - 1
    } else {
        method.sig.inputs.len()
    }
}

fn call_method(ty: &Type, method: &ImplItemFn) -> TokenStream {
    let ident = &method.sig.ident;
    let await_token = method.sig.asyncness.map(|_| quote!(.await));
    let arguments = receiver(method).map(|_| quote!(controller));

    quote! {
        action_web::future::FutureExt::boxed(async move {
            action_web::controller::IntoActionResult::into_action_result(
                <#ty>::#ident(#arguments)#await_token
            )
        })
    }
}

fn declare_method(ty: &Type, method: &ImplItemFn) -> TokenStream {
    let name = method.sig.ident.to_string().to_case(Case::Camel);
    let arity = arity(method);

    if arity > 0 || !name.starts_with(ACTION_PREFIX) {
        return quote! {
            action_web::controller::DeclaredMethod::declared(#name, #arity)
        };
    }

    let call = call_method(ty, method);
    let controller = if receiver(method).is_some() {
        quote!(controller)
    } else {
        quote!(_)
    };

    quote! {
        {
            fn action(
                #controller: &mut #ty,
            ) -> action_web::future::BoxFuture<'_, action_web::controller::ActionResult> {
                #call
            }

            action_web::controller::DeclaredMethod::action(#name, action)
        }
    }
}

fn generate_init(ty: &Type, methods: &[&ImplItemFn]) -> Option<TokenStream> {
    methods
        .iter()
        .find(|method| {
            method.sig.ident == INIT && receiver(method).is_some() && arity(method) == 0
        })
        .map(|method| {
            let call = call_method(ty, method);
            quote! {
                fn init(&mut self) -> action_web::future::BoxFuture<'_, action_web::controller::ActionResult> {
                    let controller = self;
                    #call
                }
            }
        })
}

fn validate_impl(item: &ItemImpl) -> Result<()> {
    if item.trait_.is_some() {
        return Err(Error::new(
            item.span(),
            "Only inherent impl blocks can be marked as a controller!",
        ));
    }

    if !item.generics.params.is_empty() {
        return Err(Error::new(
            item.generics.span(),
            "Generic controllers are not supported!",
        ));
    }

    Ok(())
}

pub fn generate_controller(item: &Item, args: &ControllerAttributes) -> Result<TokenStream> {
    if let Item::Impl(item) = item {
        validate_impl(item)?;

        let ty = &item.self_ty;
        let methods = item
            .items
            .iter()
            .filter_map(|item| match item {
                ImplItem::Fn(method) if is_declarable(method) => Some(method),
                _ => None,
            })
            .collect_vec();

        let declared_methods = methods.iter().map(|method| declare_method(ty, method));
        let init = generate_init(ty, &methods);
        let aliases = args.name.iter();

        Ok(quote! {
            #[automatically_derived]
            impl action_web::controller::ActionSource for #ty {
                fn declared_methods() -> Vec<action_web::controller::DeclaredMethod<Self>> {
                    vec![#(#declared_methods),*]
                }

                #init
            }

            const _: () = {
                fn register() -> action_web::registry::internal::StaticControllerDefinition {
                    action_web::registry::internal::StaticControllerDefinition {
                        definition: action_web::registry::ControllerDefinition::of::<#ty>(),
                        aliases: &[#(#aliases),*],
                    }
                }

                action_web::registry::internal::submit! {
                    action_web::registry::internal::ControllerRegisterer {
                        register
                    }
                };
            };
        })
    } else {
        Err(Error::new(
            item.span(),
            "Only impl blocks can be marked as a controller!",
        ))
    }
}
