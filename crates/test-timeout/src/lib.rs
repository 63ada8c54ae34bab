//! Test attributes that fail a test once it runs past a deadline.
//!
//! `#[test_timeout::timeout]` wraps a synchronous test, `#[test_timeout::tokio_timeout_test]`
//! wraps an async one in a fresh current-thread runtime (so `tokio::time::pause` works inside
//! it). Both accept an optional deadline in seconds: `#[test_timeout::timeout(5)]`.
//! `BEACH_TEST_TIMEOUT_SECS` overrides the deadline at run time for slow CI hosts.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, ItemFn, LitInt};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[proc_macro_attribute]
pub fn tokio_timeout_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let timeout_secs = match parse_timeout(attr) {
        Ok(secs) => secs,
        Err(err) => return err.to_compile_error().into(),
    };
    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(&sig.ident, "tokio_timeout_test expects an async fn")
            .to_compile_error()
            .into();
    }
    sig.asyncness = None;

    let attrs = strip_test_attrs(attrs);
    let body = quote! {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build Tokio runtime");
        runtime.block_on(async move #block)
    };
    let harness = deadline_harness(timeout_secs, body);

    TokenStream::from(quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            #harness
        }
    })
}

#[proc_macro_attribute]
pub fn timeout(attr: TokenStream, item: TokenStream) -> TokenStream {
    let timeout_secs = match parse_timeout(attr) {
        Ok(secs) => secs,
        Err(err) => return err.to_compile_error().into(),
    };
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_some() {
        return syn::Error::new_spanned(
            &sig.ident,
            "timeout expects a synchronous fn; use tokio_timeout_test for async tests",
        )
        .to_compile_error()
        .into();
    }

    let attrs = strip_test_attrs(attrs);
    let harness = deadline_harness(timeout_secs, quote! { #block });

    TokenStream::from(quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            #harness
        }
    })
}

fn parse_timeout(attr: TokenStream) -> syn::Result<u64> {
    if attr.is_empty() {
        return Ok(DEFAULT_TIMEOUT_SECS);
    }
    let lit: LitInt = syn::parse(attr)?;
    let secs: u64 = lit.base10_parse()?;
    if secs == 0 {
        return Err(syn::Error::new_spanned(lit, "timeout must be greater than zero"));
    }
    Ok(secs)
}

/// Runs `body` on a worker thread and panics if it has not reported back by the deadline.
/// Panics inside the body are resumed on the test thread so assertion messages survive.
fn deadline_harness(timeout_secs: u64, body: TokenStream2) -> TokenStream2 {
    quote! {
        let timeout_secs = std::env::var("BEACH_TEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(#timeout_secs);
        let deadline = std::time::Duration::from_secs(timeout_secs);
        let (sender, receiver) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| { #body }));
            let _ = sender.send(outcome);
        });
        match receiver.recv_timeout(deadline) {
            Ok(Ok(_)) => {}
            Ok(Err(payload)) => std::panic::resume_unwind(payload),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                panic!("test exceeded {}s deadline", timeout_secs)
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                panic!("test thread exited without reporting a result")
            }
        }
    }
}

fn strip_test_attrs(attrs: Vec<Attribute>) -> Vec<Attribute> {
    attrs
        .into_iter()
        .filter(|attr| {
            let path: Vec<String> = attr
                .path()
                .segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect();
            !matches!(
                path.iter().map(String::as_str).collect::<Vec<_>>().as_slice(),
                ["test"] | ["tokio", "test"]
            )
        })
        .collect()
}
