//! Static validation of submitted transform source
//!
//! A submission must define exactly one top-level
//! `fn transform(input: &[u8]) -> Vec<u8>`. Other items (`use` imports,
//! helper functions, types, consts) are allowed; the signature contract
//! is what lets the compile driver synthesize the wasm export wrapper
//! without inspecting the user code again.

use syn::{FnArg, GenericArgument, Item, ItemFn, PathArguments, ReturnType, Type};

use crate::ValidationError;

/// Name of the user-supplied entry point.
pub const TRANSFORM_FN: &str = "transform";

/// Validate a submitted source fragment without compiling it.
pub fn validate(source: &str) -> Result<(), ValidationError> {
    let file =
        syn::parse_file(source).map_err(|e| ValidationError::Syntax(e.to_string()))?;

    let transforms: Vec<&ItemFn> = file
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Fn(func) if func.sig.ident == TRANSFORM_FN => Some(func),
            _ => None,
        })
        .collect();

    match transforms.as_slice() {
        [] => Err(ValidationError::MissingTransform),
        [func] => check_signature(func),
        many => Err(ValidationError::DuplicateTransform(many.len())),
    }
}

fn check_signature(func: &ItemFn) -> Result<(), ValidationError> {
    let sig = &func.sig;

    if sig.inputs.len() != 1 {
        return Err(ValidationError::WrongArity(
            "transform must take exactly 1 parameter",
        ));
    }

    let return_ty = match &sig.output {
        ReturnType::Default => {
            return Err(ValidationError::WrongArity(
                "transform must return exactly 1 value",
            ))
        }
        ReturnType::Type(_, ty) => ty.as_ref(),
    };
    if let Type::Tuple(_) = return_ty {
        return Err(ValidationError::WrongArity(
            "transform must return exactly 1 value",
        ));
    }

    match &sig.inputs[0] {
        FnArg::Typed(param) if is_byte_slice_ref(&param.ty) => {}
        _ => {
            return Err(ValidationError::WrongType(
                "transform parameter must be &[u8]",
            ))
        }
    }

    if !is_byte_vec(return_ty) {
        return Err(ValidationError::WrongType(
            "transform must return Vec<u8>",
        ));
    }

    Ok(())
}

fn is_byte_slice_ref(ty: &Type) -> bool {
    if let Type::Reference(reference) = ty {
        if let Type::Slice(slice) = reference.elem.as_ref() {
            return is_u8(&slice.elem);
        }
    }
    false
}

fn is_byte_vec(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(segment) = path.path.segments.last() else {
        return false;
    };
    if segment.ident != "Vec" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return false;
    };
    match args.args.first() {
        Some(GenericArgument::Type(elem)) if args.args.len() == 1 => is_u8(elem),
        _ => false,
    }
}

fn is_u8(ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.path.is_ident("u8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_identity_transform() {
        let source = "fn transform(input: &[u8]) -> Vec<u8> { input.to_vec() }";
        assert_eq!(validate(source), Ok(()));
    }

    #[test]
    fn accepts_helpers_and_imports() {
        let source = r#"
use std::fmt::Write as _;

const PREFIX: &str = "hi:";

fn render(input: &[u8]) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}{}", PREFIX, String::from_utf8_lossy(input));
    out
}

fn transform(input: &[u8]) -> Vec<u8> {
    render(input).into_bytes()
}
"#;
        assert_eq!(validate(source), Ok(()));
    }

    #[test]
    fn accepts_fully_qualified_vec() {
        let source = "fn transform(data: &[u8]) -> std::vec::Vec<u8> { data.to_vec() }";
        assert_eq!(validate(source), Ok(()));
    }

    #[test]
    fn rejects_invalid_syntax() {
        let source = "fn transform(input: &[u8]) -> Vec<u8> { input.to_vec()";
        assert!(matches!(validate(source), Err(ValidationError::Syntax(_))));
    }

    #[test]
    fn rejects_missing_transform() {
        let source = "fn main() { println!(\"hello\"); }";
        assert_eq!(validate(source), Err(ValidationError::MissingTransform));
    }

    #[test]
    fn rejects_duplicate_transform() {
        let source = r#"
fn transform(input: &[u8]) -> Vec<u8> { input.to_vec() }
fn transform(input: &[u8]) -> Vec<u8> { Vec::new() }
"#;
        assert_eq!(
            validate(source),
            Err(ValidationError::DuplicateTransform(2))
        );
    }

    // The signature matrix: only (1 param, 1 result, &[u8], Vec<u8>) passes.

    #[test]
    fn rejects_zero_parameters() {
        let source = "fn transform() -> Vec<u8> { Vec::new() }";
        assert!(matches!(validate(source), Err(ValidationError::WrongArity(_))));
    }

    #[test]
    fn rejects_two_parameters() {
        let source = "fn transform(a: &[u8], b: &[u8]) -> Vec<u8> { a.to_vec() }";
        assert!(matches!(validate(source), Err(ValidationError::WrongArity(_))));
    }

    #[test]
    fn rejects_missing_return() {
        let source = "fn transform(input: &[u8]) {}";
        assert!(matches!(validate(source), Err(ValidationError::WrongArity(_))));
    }

    #[test]
    fn rejects_tuple_return() {
        let source = "fn transform(input: &[u8]) -> (Vec<u8>, usize) { (input.to_vec(), 0) }";
        assert!(matches!(validate(source), Err(ValidationError::WrongArity(_))));
    }

    #[test]
    fn rejects_unit_return() {
        let source = "fn transform(input: &[u8]) -> () {}";
        assert!(matches!(validate(source), Err(ValidationError::WrongArity(_))));
    }

    #[test]
    fn rejects_non_byte_parameter() {
        for param in ["String", "&str", "Vec<u8>", "&[u16]", "u8"] {
            let source = format!("fn transform(input: {param}) -> Vec<u8> {{ Vec::new() }}");
            assert!(
                matches!(validate(&source), Err(ValidationError::WrongType(_))),
                "parameter type {param} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_non_byte_vec_return() {
        for ret in ["String", "&[u8]", "Vec<u16>", "Vec<Vec<u8>>", "u8"] {
            let source =
                format!("fn transform(input: &[u8]) -> {ret} {{ unimplemented!() }}");
            assert!(
                matches!(validate(&source), Err(ValidationError::WrongType(_))),
                "return type {ret} should be rejected"
            );
        }
    }

    #[test]
    fn helper_named_differently_does_not_satisfy_contract() {
        let source = "fn transform_bytes(input: &[u8]) -> Vec<u8> { input.to_vec() }";
        assert_eq!(validate(source), Err(ValidationError::MissingTransform));
    }
}
