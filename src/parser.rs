use serde_json::Value;

use crate::ir::Flow;

#[derive(Debug, thiserror::Error)]
pub enum FlowParseError {
    #[error("input is empty")]
    Empty,
    #[error("input is neither valid JSON ({json}) nor JSON5 ({json5})")]
    Syntax { json: String, json5: String },
    #[error("flow has no `nodes` array")]
    MissingNodes,
    #[error("malformed flow: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Parses a flow tree from JSON (JSON5 accepted as a fallback). The flow may
/// be given bare or wrapped in a `{ "flowModel": ... }` envelope.
pub fn parse_flow(input: &str) -> Result<Flow, FlowParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FlowParseError::Empty);
    }

    let mut value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(json) => json5::from_str(trimmed).map_err(|json5| FlowParseError::Syntax {
            json: json.to_string(),
            json5: json5.to_string(),
        })?,
    };

    if let Some(model) = value.get_mut("flowModel") {
        value = model.take();
    }
    if !value.get("nodes").is_some_and(Value::is_array) {
        return Err(FlowParseError::MissingNodes);
    }

    let flow: Flow = serde_json::from_value(value)?;
    tracing::debug!(file = %flow.file_name, roots = flow.nodes.len(), "parsed flow");
    Ok(flow)
}
