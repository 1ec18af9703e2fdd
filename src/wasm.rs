use crate::document::DocumentOptions;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn project_json_to_scratchblocks(project_json: &str) -> Result<String, JsValue> {
    crate::project_json_to_scratchblocks(project_json).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn document_sb3(bytes: &[u8], scripts_only: bool) -> Result<String, JsValue> {
    let options = DocumentOptions {
        scripts_only,
        ..DocumentOptions::default()
    };
    crate::document_sb3_bytes(bytes, &options).map_err(|e| JsValue::from_str(&e.to_string()))
}
