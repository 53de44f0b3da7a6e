use syn::{Attribute, LitStr};

/// Attributes on the deriving type.
#[derive(Default)]
pub(crate) struct ContainerAttrs {
    pub tag: Option<String>,
}

/// Attributes on a single field.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub skip: bool,
    pub rename: Option<String>,
}

pub(crate) fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut result = ContainerAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("entity tag must not be empty"));
                }
                result.tag = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute, expected `tag`"))
            }
        })?;
    }

    Ok(result)
}

pub(crate) fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported entity field attribute, expected `skip` or `rename`"))
            }
        })?;
    }

    Ok(result)
}
