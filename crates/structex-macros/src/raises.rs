//! Expansion of `#[raises(...)]`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{ItemFn, LitStr, ReturnType};

use crate::parse::RaisesAttrs;

/// Expands the `#[raises]` attribute macro.
///
/// 1. Parse the allow-list and the function
/// 2. Append a "Raises" section to the function's rustdoc
/// 3. Declare the contract as a function-local static and register it by path
/// 4. Run the original body under the contract
pub fn expand_raises(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let attrs: RaisesAttrs = syn::parse2(attr)?;
    let item_fn: ItemFn = syn::parse2(item)?;
    check_signature(&attrs, &item_fn)?;

    Ok(generate(&attrs, &item_fn))
}

fn check_signature(attrs: &RaisesAttrs, item_fn: &ItemFn) -> syn::Result<()> {
    let sig = &item_fn.sig;
    // `module_path!()` cannot see the impl type, so `A::run` and `B::run`
    // would register under the same path.
    if let (Some(receiver), None) = (sig.receiver(), &attrs.path) {
        return Err(syn::Error::new_spanned(
            receiver,
            "#[raises] on a method needs an explicit `path = \"Type::method\"`",
        ));
    }
    if let Some(asyncness) = sig.asyncness {
        return Err(syn::Error::new(
            asyncness.span,
            "#[raises] does not support async functions",
        ));
    }
    if let Some(constness) = sig.constness {
        return Err(syn::Error::new(
            constness.span,
            "#[raises] does not support const functions",
        ));
    }
    if matches!(sig.output, ReturnType::Default) {
        return Err(syn::Error::new(
            sig.fn_token.span,
            "#[raises] requires a function returning `Result<_, Exception>`",
        ));
    }
    Ok(())
}

fn doc_section(attrs: &RaisesAttrs) -> TokenStream {
    let mut labels = Vec::new();
    for item in &attrs.items {
        item.doc_labels(&mut labels);
    }

    let mut lines = vec![String::new(), "# Raises".to_string(), String::new()];
    if labels.is_empty() {
        lines.push("Raises nothing: every error is converted to `BadExceptionBug`.".to_string());
    } else {
        lines.extend(labels.into_iter().map(|label| format!("- {label}")));
    }

    quote! { #( #[doc = #lines] )* }
}

fn generate(attrs: &RaisesAttrs, item_fn: &ItemFn) -> TokenStream {
    let krate = &attrs.krate;
    let fn_attrs = &item_fn.attrs;
    let vis = &item_fn.vis;
    let sig = &item_fn.sig;
    let block = &item_fn.block;
    let name = &sig.ident;

    let allows = attrs.items.iter().map(|item| item.to_allow(krate));
    let docs = doc_section(attrs);

    let path = attrs.path.as_ref().map_or_else(
        || quote! { ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#name)) },
        |path: &LitStr| quote! { #path },
    );

    quote! {
        #(#fn_attrs)*
        #docs
        #vis #sig {
            const __STRUCTEX_PATH: &str = #path;

            static __STRUCTEX_RAISES: ::std::sync::LazyLock<#krate::raises::Raises> =
                ::std::sync::LazyLock::new(|| {
                    #krate::raises::Raises::new(
                        ::std::vec::Vec::<#krate::raises::Allow>::from([#(#allows),*]),
                    )
                    .named(__STRUCTEX_PATH)
                });

            #krate::__private::inventory::submit! {
                #krate::raises::NamedContract::new(__STRUCTEX_PATH, &__STRUCTEX_RAISES)
            }

            __STRUCTEX_RAISES.call(move || #block)
        }
    }
}
