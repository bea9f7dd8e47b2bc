#![allow(unreachable_pub)]

//! # Macros
//!
//! Procedural macros used across the flash workspace.
//!
//! Only one macro lives here today: [`macro@flash_error`], which turns a plain enum
//! into a `thiserror` error with a context-carrying extension trait.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context()`
///   to `Result<T, Name>` and to `Result<T, Source>` for every wrapped source error.
/// * **Standard Conversions**: Implements `From<Source>` for variants with a `source`
///   field (or a field marked `#[source]`/`#[from]`), so `?` works on upstream errors.
/// * **Internal Fallback**: Implements `From<&'static str>` and `From<String>` when an
///   `Internal { message, context }` variant exists.
/// * **Formatting Helper**: Emits a module-private `format_context` function for use in
///   `#[error(...)]` strings.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with **named-field** variants only.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. Variants with a source field must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use flash_derive::flash_error;
/// use std::borrow::Cow;
///
/// #[flash_error]
/// pub enum StoreError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load(path: &str) -> Result<Vec<u8>, StoreError> {
///     std::fs::read(path).context("Reading container")
/// }
/// ```
#[proc_macro_attribute]
pub fn flash_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}
