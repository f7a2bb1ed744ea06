// Placeholder guest source. The compile driver overwrites this file
// with the PDK prelude, the submitted transform, and the generated
// TransformWrapper export.

use extism_pdk::*;

fn transform(input: &[u8]) -> Vec<u8> {
    input.to_vec()
}

#[allow(non_snake_case)]
#[plugin_fn]
pub fn TransformWrapper(input: Vec<u8>) -> FnResult<Vec<u8>> {
    Ok(transform(&input))
}
