//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// System template for `{input, response, reference}`
pub const GROUND_TRUTH: &str = include_str!("../../prompts/ground-truth.pmt");

/// System template for `{input, response, context}`
pub const RAG: &str = include_str!("../../prompts/rag.pmt");

/// System template for `{input, response}`
pub const REFERENCE_FREE: &str = include_str!("../../prompts/reference-free.pmt");

/// System template for `{input, response, context, reference}`
pub const CONTEXT_REFERENCE: &str = include_str!("../../prompts/context-reference.pmt");

/// User request sent alongside a system template
pub const REQUEST: &str = include_str!("../../prompts/request.pmt");

/// Few-shot example generator prompt
pub const EXAMPLE: &str = include_str!("../../prompts/example.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "ground-truth" => Some(GROUND_TRUTH),
        "rag" => Some(RAG),
        "reference-free" => Some(REFERENCE_FREE),
        "context-reference" => Some(CONTEXT_REFERENCE),
        "request" => Some(REQUEST),
        "example" => Some(EXAMPLE),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_templates_embedded() {
        for name in ["ground-truth", "rag", "reference-free", "context-reference"] {
            let template = get_embedded(name).unwrap();
            assert!(template.contains("evaluation prompts"), "{name}");
            assert!(template.contains("[Few-shot examples if given]"), "{name}");
        }
    }

    #[test]
    fn test_templates_show_their_variables() {
        assert!(GROUND_TRUTH.contains("REFERENCE RESPONSE:"));
        assert!(!GROUND_TRUTH.contains("CONTEXT:"));
        assert!(RAG.contains("CONTEXT:"));
        assert!(!RAG.contains("REFERENCE RESPONSE:"));
        assert!(!REFERENCE_FREE.contains("CONTEXT:"));
        assert!(CONTEXT_REFERENCE.contains("CONTEXT:"));
        assert!(CONTEXT_REFERENCE.contains("REFERENCE RESPONSE:"));
    }

    #[test]
    fn test_request_template_fields() {
        let request = get_embedded("request").unwrap();
        assert!(request.contains("{{criteria}}"));
        assert!(request.contains("{{rubric}}"));
        assert!(request.contains("{{#if examples}}"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("plan").is_none());
    }
}
