use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{parse_quote, spanned::Spanned, ImplItem, Item, ItemFn, ItemImpl, LitStr};

/// Captures the token text of a pass implementation so it can serve as the pass identity.
///
/// On a trait `impl` block the attribute adds a `source_text` method returning the block's
/// text. On a function it emits a `<NAME>_SOURCE` constant next to it with the same visibility.
/// The text is the token stream as written minus plain comments, so reformatting-only edits may
/// still change it.
#[proc_macro_attribute]
pub fn pass_source(attr: TokenStream, item: TokenStream) -> TokenStream {
    match expand_pass_source(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_pass_source(attr: TokenStream2, item: TokenStream2) -> syn::Result<TokenStream2> {
    if !attr.is_empty() {
        return Err(syn::Error::new(
            attr.span(),
            "pass_source does not take arguments",
        ));
    }

    let source = item.to_string();
    match syn::parse2::<Item>(item)? {
        Item::Impl(block) => expand_impl(block, &source),
        Item::Fn(function) => expand_fn(function, &source),
        other => Err(syn::Error::new(
            other.span(),
            "pass_source applies to trait impl blocks and functions",
        )),
    }
}

fn expand_impl(mut block: ItemImpl, source: &str) -> syn::Result<TokenStream2> {
    if block.trait_.is_none() {
        return Err(syn::Error::new(
            block.self_ty.span(),
            "pass_source on an impl block requires a trait impl (e.g. `impl GraphPass<G> for T`)",
        ));
    }

    let already_defined = block.items.iter().any(|item| match item {
        ImplItem::Fn(method) => method.sig.ident == "source_text",
        _ => false,
    });
    if already_defined {
        return Err(syn::Error::new(
            block.span(),
            "pass_source generates `source_text`; remove the manual definition",
        ));
    }

    let lit = LitStr::new(source, Span::call_site());
    block.items.push(parse_quote! {
        fn source_text(&self) -> ::core::option::Option<&'static str> {
            ::core::option::Option::Some(#lit)
        }
    });
    Ok(quote!(#block))
}

fn expand_fn(function: ItemFn, source: &str) -> syn::Result<TokenStream2> {
    let fn_name = function.sig.ident.to_string();
    let fn_name = fn_name.trim_start_matches("r#");
    let const_ident = format_ident!("{}_SOURCE", fn_name.to_uppercase());
    let vis = &function.vis;
    let lit = LitStr::new(source, Span::call_site());
    let doc = format!("Source text of `{fn_name}`, captured for pass identity.");

    Ok(quote! {
        #function

        #[doc = #doc]
        #[allow(dead_code)]
        #vis const #const_ident: &str = #lit;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(attr: TokenStream2, item: TokenStream2) -> syn::Result<String> {
        expand_pass_source(attr, item).map(|tokens| tokens.to_string())
    }

    #[test]
    fn impl_block_gains_source_text() {
        let item = quote! {
            impl GraphPass<Graph> for Fuse {
                fn run(&self, graph: &mut Graph) -> PassOutcome { PassOutcome::default() }
            }
        };
        let captured = item.to_string();
        let expanded = expand(TokenStream2::new(), item).unwrap();

        assert!(expanded.contains("fn source_text"));
        let lit = LitStr::new(&captured, Span::call_site());
        assert!(expanded.contains(&quote!(#lit).to_string()));
    }

    #[test]
    fn function_gains_source_constant() {
        let item = quote! {
            pub fn fold_constants(graph: &mut Graph) {}
        };
        let expanded = expand(TokenStream2::new(), item).unwrap();
        assert!(expanded.contains("pub const FOLD_CONSTANTS_SOURCE"));
        assert!(expanded.contains("pub fn fold_constants"));
    }

    #[test]
    fn raw_identifiers_drop_the_prefix() {
        let item = quote! {
            fn r#match(graph: &mut Graph) {}
        };
        let expanded = expand(TokenStream2::new(), item).unwrap();
        assert!(expanded.contains("MATCH_SOURCE"));
    }

    #[test]
    fn inherent_impl_is_rejected() {
        let item = quote! {
            impl Fuse {
                fn helper(&self) {}
            }
        };
        let err = expand(TokenStream2::new(), item).unwrap_err();
        assert!(err.to_string().contains("requires a trait impl"));
    }

    #[test]
    fn manual_source_text_is_rejected() {
        let item = quote! {
            impl GraphPass<Graph> for Fuse {
                fn source_text(&self) -> Option<&'static str> { None }
            }
        };
        let err = expand(TokenStream2::new(), item).unwrap_err();
        assert!(err.to_string().contains("remove the manual definition"));
    }

    #[test]
    fn arguments_and_other_items_are_rejected() {
        let err = expand(quote!(strict), quote!(fn f() {})).unwrap_err();
        assert!(err.to_string().contains("does not take arguments"));

        let err = expand(TokenStream2::new(), quote!(struct Fuse;)).unwrap_err();
        assert!(err.to_string().contains("trait impl blocks and functions"));
    }
}
