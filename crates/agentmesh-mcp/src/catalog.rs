//! Plain-text rendering of a server's tool list.

use crate::protocol::McpToolDef;

/// Renders the tool list as the catalog text a capability summary is built
/// from. Used verbatim when no summarizer is available.
pub fn render_catalog(tools: &[McpToolDef]) -> String {
    if tools.is_empty() {
        return "No tools advertised.".to_string();
    }

    let mut out = String::new();
    for tool in tools {
        out.push_str("- ");
        out.push_str(&tool.name);
        if !tool.description.is_empty() {
            out.push_str(": ");
            out.push_str(tool.description.trim());
        }
        let params = parameter_names(&tool.input_schema);
        if !params.is_empty() {
            out.push_str(&format!(" (args: {})", params.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// Property names of an object schema, required ones marked with `*`.
fn parameter_names(schema: &serde_json::Value) -> Vec<String> {
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|r| r.iter().filter_map(serde_json::Value::as_str).collect())
        .unwrap_or_default();

    schema["properties"]
        .as_object()
        .map(|props| {
            props
                .keys()
                .map(|k| {
                    if required.contains(&k.as_str()) {
                        format!("{k}*")
                    } else {
                        k.clone()
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}
