//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Parses the import ID as an integer and stores it as a number.
///
/// `label` names the thing being imported in the error detail, e.g.
/// "the Tines Resource".
pub fn import_state_passthrough_int_id(
    _ctx: &Context,
    attr_path: AttributePath,
    label: &str,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let id = match request.id.trim().parse::<i64>() {
        Ok(id) => id,
        Err(e) => {
            response.diagnostics.push(Diagnostic::error(
                "Import Error",
                format!("Could not determine the ID of {}: {}", label, e),
            ));
            return;
        }
    };

    push_imported(attr_path, Dynamic::Number(id as f64), request, response);
}

fn push_imported(
    attr_path: AttributePath,
    value: Dynamic,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::object();

    if let Err(e) = state.set_value(&attr_path, value) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "tines_resource".to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[test]
    fn int_id_is_parsed() {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_int_id(
            &Context::new(),
            AttributePath::new("id"),
            "the Tines Resource",
            &request("123"),
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_i64(&AttributePath::new("id")).unwrap(), 123);
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_int_id(
            &Context::new(),
            AttributePath::new("id"),
            "the Tines Resource",
            &request("abc"),
            &mut response,
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Import Error");
        assert!(response.diagnostics[0]
            .detail
            .starts_with("Could not determine the ID of the Tines Resource"));
    }
}
