use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, LitStr, Meta, NestedMeta};


#[proc_macro_derive(Record, attributes(table, column, key))]
pub fn record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

struct PersistedField {
    ident: syn::Ident,
    column: String,
}

pub(crate) fn record_impl(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // table attribute
    let mut table_name = to_snake_case(&struct_name.to_string());
    for attr in &input.attrs {
        if attr.path.is_ident("table") {
            if let Meta::List(list) = attr.parse_meta()? {
                for nested in list.nested.iter() {
                    match nested {
                        NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("name") => {
                            if let Lit::Str(s) = &nv.lit {
                                table_name = s.value();
                            }
                        }
                        other => {
                            return Err(syn::Error::new_spanned(
                                other,
                                "expected `#[table(name = \"...\")]`",
                            ))
                        }
                    }
                }
            }
        }
    }

    let named = match &input.data {
        Data::Struct(ds) => match &ds.fields {
            Fields::Named(fields_named) => &fields_named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    struct_name,
                    "#[derive(Record)] requires named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "#[derive(Record)] only supports structs",
            ))
        }
    };

    let mut persisted: Vec<PersistedField> = Vec::new();
    let mut ignored: Vec<syn::Ident> = Vec::new();
    let mut key_field: Option<syn::Ident> = None;

    for field in named.iter() {
        let ident = match &field.ident {
            Some(ident) => ident.clone(),
            None => continue,
        };
        let mut column = to_snake_case(&ident.to_string());
        let mut is_key = false;
        let mut ignore = false;

        for attr in field.attrs.iter() {
            if attr.path.is_ident("column") {
                if let Meta::List(list) = attr.parse_meta()? {
                    for nested in list.nested.iter() {
                        match nested {
                            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("name") => {
                                if let Lit::Str(s) = &nv.lit {
                                    column = s.value();
                                }
                            }
                            NestedMeta::Meta(Meta::Path(p)) if p.is_ident("ignore") => {
                                ignore = true;
                            }
                            other => {
                                return Err(syn::Error::new_spanned(
                                    other,
                                    "expected `name = \"...\"` or `ignore`",
                                ))
                            }
                        }
                    }
                }
            } else if attr.path.is_ident("key") {
                is_key = true;
                if let Meta::List(list) = attr.parse_meta()? {
                    for nested in list.nested.iter() {
                        match nested {
                            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("name") => {
                                if let Lit::Str(s) = &nv.lit {
                                    column = s.value();
                                }
                            }
                            other => {
                                return Err(syn::Error::new_spanned(
                                    other,
                                    "expected `#[key(name = \"...\")]`",
                                ))
                            }
                        }
                    }
                }
            }
        }

        if ignore {
            if is_key {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "the identifier field cannot be ignored",
                ));
            }
            ignored.push(ident);
            continue;
        }
        if is_key {
            if key_field.is_some() {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "only one field can be marked #[key]",
                ));
            }
            key_field = Some(ident.clone());
        }
        persisted.push(PersistedField { ident, column });
    }

    // Without an explicit #[key] the field named `id` is the identifier.
    let key_field = match key_field {
        Some(k) => k,
        None => persisted
            .iter()
            .find(|f| f.ident == "id")
            .map(|f| f.ident.clone())
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    struct_name,
                    "#[derive(Record)] needs an `id` field or a field marked #[key]",
                )
            })?,
    };

    let type_name_lit = LitStr::new(&struct_name.to_string(), Span::call_site());
    let table_name_lit = LitStr::new(&table_name, Span::call_site());
    let key_field_lit = LitStr::new(&key_field.to_string(), Span::call_site());

    let mut field_metas = Vec::new();
    let mut from_row_fields = Vec::new();
    let mut column_arms = Vec::new();
    let mut assoc_consts = Vec::new();

    for f in &persisted {
        let ident = &f.ident;
        let field_lit = LitStr::new(&ident.to_string(), Span::call_site());
        let column_lit = LitStr::new(&f.column, Span::call_site());
        field_metas.push(quote! {
            ::rquery_repo::mapping::FieldMeta { field: #field_lit, column: #column_lit }
        });
        from_row_fields.push(quote! { #ident: row.get(#column_lit)? });
        column_arms.push(quote! {
            #column_lit => Some(::rquery_repo::query::ToParam::to_param(self.#ident.clone()))
        });
        assoc_consts.push(quote! { pub const #ident: &'static str = #column_lit; });
    }
    for ident in &ignored {
        from_row_fields.push(quote! { #ident: ::core::default::Default::default() });
    }

    let expanded = quote! {
        #[allow(clippy::clone_on_copy)]
        impl #impl_generics ::rquery_repo::mapping::Record for #struct_name #ty_generics #where_clause {
            fn schema() -> &'static ::rquery_repo::mapping::RecordSchema {
                static FIELDS: &[::rquery_repo::mapping::FieldMeta] = &[#(#field_metas),*];
                static SCHEMA: ::rquery_repo::mapping::RecordSchema = ::rquery_repo::mapping::RecordSchema {
                    type_name: #type_name_lit,
                    table: #table_name_lit,
                    id_field: #key_field_lit,
                    fields: FIELDS,
                };
                &SCHEMA
            }

            fn id(&self) -> ::rquery_repo::query::SqlParam {
                ::rquery_repo::query::ToParam::to_param(self.#key_field.clone())
            }

            fn set_id(&mut self, id: ::rquery_repo::query::SqlParam) -> ::rquery_repo::error::Result<()> {
                self.#key_field = ::rquery_repo::query::FromSqlParam::from_param(&id)?;
                Ok(())
            }

            fn from_row(row: &::rquery_repo::query::Row) -> ::rquery_repo::error::Result<Self> {
                Ok(Self { #(#from_row_fields),* })
            }

            fn column_value(&self, column: &str) -> Option<::rquery_repo::query::SqlParam> {
                match column {
                    #(#column_arms,)*
                    _ => None,
                }
            }
        }

        #[allow(non_upper_case_globals)]
        impl #impl_generics #struct_name #ty_generics #where_clause {
            pub const TABLE: &'static str = #table_name_lit;
            #(#assoc_consts)*
        }
    };

    Ok(expanded)
}

/// Same conversion the runtime crate applies, done at expansion time.
fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        let current = chars[i];
        match chars.get(i + 1) {
            Some(next) if next.is_uppercase() => {
                out.push(current);
                if current != '_' {
                    out.push('_');
                }
                out.push(*next);
                i += 2;
            }
            _ => {
                out.push(current);
                i += 1;
            }
        }
    }
    out.to_lowercase()
}
