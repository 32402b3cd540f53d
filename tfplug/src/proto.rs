//! Generated protobuf types for the Terraform plugin protocol.
//!
//! The code is produced by `tonic_build` from `proto/tfplugin6.proto` at build
//! time. RPC request and response messages live in snake_case modules, e.g.
//! `read_resource::Request`. Several names overlap with framework types
//! (`DynamicValue`, `Diagnostic`, `AttributePath`, `Schema`), so refer to these
//! through the `proto::` prefix.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_protocol_types_resolve() {
        let _ = diagnostic::Severity::Warning;
        let _ = attribute_path::step::Selector::AttributeName("name".to_string());
        let _ = StringKind::Markdown;
        let _ = plan_resource_change::Response::default();
        let _ = import_resource_state::ImportedResource::default();
    }
}
