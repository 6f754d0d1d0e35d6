//! Parsing for `#[raises(...)]` arguments.

use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use syn::{
    bracketed, parenthesized,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    token, Expr, Ident, LitStr, Path, Token, Type,
};

/// One entry of the allow-list.
#[derive(Debug)]
pub enum AllowItem {
    /// `None`: permits nothing.
    Nothing,
    /// `Any`: permits every error.
    Any,
    /// `native(Type)` or `native(Type, "title")`.
    Native {
        /// The concrete error type.
        ty: Type,
        /// Optional documentation title.
        title: Option<LitStr>,
    },
    /// `[a, b, ...]`: a nested list.
    List(Vec<AllowItem>),
    /// Any other expression, typically a problem-type static.
    Expr(Expr),
}

fn peek_keyword(input: ParseStream, keyword: &str) -> bool {
    let fork = input.fork();
    match fork.parse::<Ident>() {
        Ok(ident) if ident == keyword => fork.is_empty() || fork.peek(Token![,]),
        _ => false,
    }
}

fn peek_native(input: ParseStream) -> bool {
    let fork = input.fork();
    matches!(fork.parse::<Ident>(), Ok(ident) if ident == "native") && fork.peek(token::Paren)
}

impl Parse for AllowItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(token::Bracket) {
            let content;
            bracketed!(content in input);
            let items: Punctuated<AllowItem, Token![,]> = Punctuated::parse_terminated(&content)?;
            return Ok(Self::List(items.into_iter().collect()));
        }

        if peek_keyword(input, "None") {
            input.parse::<Ident>()?;
            return Ok(Self::Nothing);
        }

        if peek_keyword(input, "Any") {
            input.parse::<Ident>()?;
            return Ok(Self::Any);
        }

        if peek_native(input) {
            input.parse::<Ident>()?;
            let content;
            parenthesized!(content in input);
            let ty: Type = content.parse()?;
            let title = if content.peek(Token![,]) {
                content.parse::<Token![,]>()?;
                if content.is_empty() {
                    None
                } else {
                    Some(content.parse::<LitStr>()?)
                }
            } else {
                None
            };
            if !content.is_empty() {
                return Err(content.error("expected `native(Type)` or `native(Type, \"title\")`"));
            }
            return Ok(Self::Native { ty, title });
        }

        Ok(Self::Expr(input.parse()?))
    }
}

impl AllowItem {
    /// Generates the `Allow` expression for this entry.
    pub fn to_allow(&self, krate: &Path) -> TokenStream {
        match self {
            Self::Nothing => quote! { #krate::raises::Allow::Nothing },
            Self::Any => quote! { #krate::raises::Allow::any() },
            Self::Native { ty, title: None } => {
                quote! { #krate::raises::Allow::native::<#ty>() }
            }
            Self::Native {
                ty,
                title: Some(title),
            } => quote! {
                #krate::raises::Allow::Class(
                    #krate::raises::ExceptionClass::native_titled::<#ty>(#title)
                )
            },
            Self::List(items) => {
                let items = items.iter().map(|item| item.to_allow(krate));
                quote! { #krate::raises::Allow::Many(::std::vec![#(#items),*]) }
            }
            Self::Expr(expr) => quote! { #krate::raises::Allow::from(&#expr) },
        }
    }

    /// Collects the rustdoc labels of this entry, flattening lists.
    pub fn doc_labels(&self, out: &mut Vec<String>) {
        match self {
            Self::Nothing => {}
            Self::Any => out.push("any error".to_string()),
            Self::Native { ty, .. } => out.push(format!("`{}`", compact(ty))),
            Self::List(items) => items.iter().for_each(|item| item.doc_labels(out)),
            Self::Expr(expr) => out.push(format!("`{}`", compact(expr))),
        }
    }
}

fn compact(tokens: &impl ToTokens) -> String {
    tokens.to_token_stream().to_string().replace(' ', "")
}

/// Parsed `#[raises(...)]` arguments.
#[derive(Debug)]
pub struct RaisesAttrs {
    /// The allow-list, as written.
    pub items: Vec<AllowItem>,
    /// Path to the runtime crate (`crate = ...`); defaults to `::structex`.
    pub krate: Path,
    /// Registration path override (`path = "..."`).
    pub path: Option<LitStr>,
}

impl Parse for RaisesAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut items = Vec::new();
        let mut krate = None;
        let mut path = None;

        while !input.is_empty() {
            if input.peek(Token![crate]) && input.peek2(Token![=]) {
                input.parse::<Token![crate]>()?;
                input.parse::<Token![=]>()?;
                krate = Some(input.parse::<Path>()?);
            } else if input.peek(Ident) && input.peek2(Token![=]) && !input.peek2(Token![==]) {
                let key: Ident = input.parse()?;
                input.parse::<Token![=]>()?;
                if key != "path" {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown attribute: {key}"),
                    ));
                }
                path = Some(input.parse::<LitStr>()?);
            } else {
                items.push(input.parse::<AllowItem>()?);
            }

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        let krate = krate.unwrap_or_else(|| {
            let structex = Ident::new("structex", Span::call_site());
            syn::parse_quote!(::#structex)
        });

        Ok(Self { items, krate, path })
    }
}
