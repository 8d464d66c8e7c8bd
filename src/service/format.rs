//! Markdown rendering of a completed run.

use crate::sandbox::CODE_INTERPRETER_TOOL;
use crate::types::RunMetrics;

/// Render a run's answer with the executed sandbox code, when any ran.
pub fn format_response(text: &str, metrics: &RunMetrics) -> String {
    let mut parts = Vec::new();

    if let Some(record) = metrics.tool_call(CODE_INTERPRETER_TOOL) {
        if let Some(code) = record.arguments.get("code").and_then(|v| v.as_str()) {
            let language = record
                .arguments
                .get("language")
                .and_then(|v| v.as_str())
                .unwrap_or("python");
            parts.push(format!(
                "## Executed Code:\n```{language}\n{code}\n```\n---\n"
            ));
        }
    }

    parts.push(format!("## Result:\n{text}"));
    parts.join("\n")
}
