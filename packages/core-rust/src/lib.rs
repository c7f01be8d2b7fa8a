//! Courier Core — shared envelope model, routing results, and JSON Schema
//! validation for the courier message-dispatch library.

pub mod context;
pub mod envelope;
pub mod result;
pub mod schema;

pub use context::RouteContext;
pub use envelope::{HandlerKey, MessageEnvelope, MessageMetadata, ENVELOPE_SCHEMA};
pub use result::{HandlerResult, RoutedResult};
pub use schema::{SchemaError, SchemaValidator};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }

    #[test]
    fn envelope_schema_compiles() {
        super::SchemaValidator::compile(super::ENVELOPE_SCHEMA).unwrap();
    }
}
