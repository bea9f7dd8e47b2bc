use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Field, Fields, FieldsNamed, GenericArgument, Ident};
use syn::{PathArguments, Type, Variant};

/// What the expansion needs to know about one enum variant.
struct VariantSpec<'a> {
    ident: &'a Ident,
    source: Option<(&'a Ident, &'a Type)>,
    has_context: bool,
    cfg: Vec<&'a Attribute>,
}

pub fn expand(input: DeriveInput) -> TokenStream {
    let Data::Enum(data) = &input.data else {
        return quote! { compile_error!("flash_error can only be applied to enums"); };
    };

    let specs = match data.variants.iter().map(inspect_variant).collect::<Result<Vec<_>, _>>() {
        Ok(specs) => specs,
        Err(err) => return err.to_compile_error(),
    };

    if let Some(orphan) = specs.iter().find(|s| s.source.is_some() && !s.has_context) {
        return syn::Error::new_spanned(
            orphan.ident,
            "flash_error requires `context: Option<Cow<'static, str>>` next to a source field",
        )
        .to_compile_error();
    }

    let name = &input.ident;
    let ext = format_ident!("{}Ext", name);

    let derives = missing_derives(&input.attrs);
    let ext_trait = expand_ext_trait(name, &ext, &specs);
    let conversions = specs.iter().filter_map(|s| expand_source_conversion(name, &ext, s));
    let fallback = expand_internal_fallback(name, &specs);

    quote! {
        #[allow(non_shorthand_field_patterns)]
        #derives
        #input

        #ext_trait
        #(#conversions)*
        #fallback

        #[allow(dead_code)]
        fn format_context(
            context: &Option<std::borrow::Cow<'static, str>>,
        ) -> std::borrow::Cow<'static, str> {
            match context {
                Some(c) => std::borrow::Cow::Owned(format!(" ({c})")),
                None => std::borrow::Cow::Borrowed(""),
            }
        }
    }
}

fn inspect_variant(variant: &Variant) -> Result<VariantSpec<'_>, syn::Error> {
    let Fields::Named(fields) = &variant.fields else {
        return Err(syn::Error::new_spanned(
            variant,
            "flash_error variants must use named fields (`Variant { message, context }`)",
        ));
    };

    let has_context = match named(fields, "context") {
        Some(field) if is_optional_static_cow(&field.ty) => true,
        Some(field) => {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "context field must be Option<Cow<'static, str>>",
            ));
        },
        None => false,
    };

    let source = fields
        .named
        .iter()
        .find(|f| {
            f.ident.as_ref().is_some_and(|i| i == "source")
                || has_attr(f, "source")
                || has_attr(f, "from")
        })
        .and_then(|f| f.ident.as_ref().map(|ident| (ident, &f.ty)));

    Ok(VariantSpec {
        ident: &variant.ident,
        source,
        has_context,
        cfg: variant.attrs.iter().filter(|a| a.path().is_ident("cfg")).collect(),
    })
}

fn expand_ext_trait(name: &Ident, ext: &Ident, specs: &[VariantSpec<'_>]) -> TokenStream {
    let arms = specs.iter().filter(|s| s.has_context).map(|s| {
        let cfg = &s.cfg;
        let ident = s.ident;
        quote! { #(#cfg)* #name::#ident { context: slot, .. } => *slot = Some(context.into()), }
    });

    quote! {
        pub trait #ext<T> {
            fn context(
                self,
                context: impl Into<std::borrow::Cow<'static, str>>,
            ) -> Result<T, #name>;
        }

        #[automatically_derived]
        impl<T> #ext<T> for Result<T, #name> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                self.map_err(|mut err| {
                    match &mut err {
                        #(#arms)*
                        #[allow(unreachable_patterns)]
                        _ => {},
                    }
                    err
                })
            }
        }
    }
}

fn expand_source_conversion(
    name: &Ident,
    ext: &Ident,
    spec: &VariantSpec<'_>,
) -> Option<TokenStream> {
    if spec.ident == "Internal" {
        return None;
    }
    let (field, ty) = spec.source?;
    let variant = spec.ident;
    let cfg = &spec.cfg;

    Some(quote! {
        #(#cfg)*
        #[automatically_derived]
        impl From<#ty> for #name {
            #[inline]
            fn from(#field: #ty) -> Self {
                Self::#variant { #field, context: None }
            }
        }

        #(#cfg)*
        #[automatically_derived]
        impl<T> #ext<T> for std::result::Result<T, #ty> {
            #[inline]
            fn context(
                self,
                context: impl Into<std::borrow::Cow<'static, str>>,
            ) -> std::result::Result<T, #name> {
                self.map_err(|#field| #name::#variant { #field, context: Some(context.into()) })
            }
        }
    })
}

fn expand_internal_fallback(name: &Ident, specs: &[VariantSpec<'_>]) -> TokenStream {
    let Some(internal) = specs.iter().find(|s| s.ident == "Internal") else {
        return TokenStream::new();
    };
    let cfg = &internal.cfg;

    quote! {
        #(#cfg)*
        impl From<&'static str> for #name {
            #[inline]
            fn from(message: &'static str) -> Self {
                Self::Internal { message: std::borrow::Cow::Borrowed(message), context: None }
            }
        }

        #(#cfg)*
        impl From<String> for #name {
            #[inline]
            fn from(message: String) -> Self {
                Self::Internal { message: std::borrow::Cow::Owned(message), context: None }
            }
        }
    }
}

/// Emits `#[derive(Debug, thiserror::Error)]` minus whatever the user already derives.
fn missing_derives(attrs: &[Attribute]) -> TokenStream {
    let mut has_debug = false;
    let mut has_error = false;

    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            match meta.path.segments.last().map(|s| s.ident.to_string()).as_deref() {
                Some("Debug") => has_debug = true,
                Some("Error") => has_error = true,
                _ => {},
            }
            Ok(())
        });
    }

    let mut derives = Vec::new();
    if !has_debug {
        derives.push(quote! { Debug });
    }
    if !has_error {
        derives.push(quote! { ::thiserror::Error });
    }

    if derives.is_empty() { TokenStream::new() } else { quote! { #[derive(#(#derives),*)] } }
}

fn named<'a>(fields: &'a FieldsNamed, name: &str) -> Option<&'a Field> {
    fields.named.iter().find(|f| f.ident.as_ref().is_some_and(|i| i == name))
}

fn has_attr(field: &Field, name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(name))
}

/// Matches `Option<Cow<'static, str>>` by the last path segment of each type.
fn is_optional_static_cow(ty: &Type) -> bool {
    let Some(cow) = single_generic(ty, "Option") else {
        return false;
    };
    let Type::Path(path) = cow else {
        return false;
    };
    let Some(segment) = path.path.segments.last() else {
        return false;
    };
    if segment.ident != "Cow" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return false;
    };

    let mut args = args.args.iter();
    let lifetime_ok =
        matches!(args.next(), Some(GenericArgument::Lifetime(lt)) if lt.ident == "static");
    let inner_ok = matches!(
        args.next(),
        Some(GenericArgument::Type(Type::Path(p)))
            if p.path.segments.last().is_some_and(|s| s.ident == "str")
    );

    lifetime_ok && inner_ok && args.next().is_none()
}

fn single_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
