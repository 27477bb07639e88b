//! JSON Schema validation of call arguments.

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::error::ToolError;

/// Compiled argument schema; a null or empty schema accepts anything.
pub struct ArgumentValidator {
    schema: Option<JSONSchema>,
}

impl std::fmt::Debug for ArgumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentValidator")
            .field("enforcing", &self.schema.is_some())
            .finish()
    }
}

impl ArgumentValidator {
    pub fn accept_all() -> Self {
        Self { schema: None }
    }

    pub fn compile(schema: &Value) -> Result<Self, ToolError> {
        let empty = match schema {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Ok(Self::accept_all());
        }

        let compiled = JSONSchema::options()
            .compile(schema)
            .map_err(|err| ToolError::invalid_definition(format!("invalid schema: {err}")))?;

        Ok(Self {
            schema: Some(compiled),
        })
    }

    pub fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };

        if let Err(errors) = schema.validate(args) {
            let message = errors
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ToolError::invalid_arguments(message));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ArgumentValidator;
    use crate::error::ToolErrorKind;

    #[test]
    fn empty_schemas_accept_anything() {
        for schema in [json!(null), json!({})] {
            let validator = ArgumentValidator::compile(&schema).expect("schema should compile");
            assert!(validator.validate(&json!([1, 2, 3])).is_ok());
        }
    }

    #[test]
    fn violations_are_reported_as_invalid_arguments() {
        let validator = ArgumentValidator::compile(&json!({
            "type": "object",
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        }))
        .expect("schema should compile");

        assert!(validator.validate(&json!({ "city": "Oslo" })).is_ok());

        let err = validator
            .validate(&json!({ "city": 7 }))
            .expect_err("wrong type should fail");
        assert_eq!(err.kind, ToolErrorKind::InvalidArguments);

        let err = validator
            .validate(&json!({}))
            .expect_err("missing field should fail");
        assert!(err.message.contains("city"));
    }

    #[test]
    fn malformed_schema_is_an_invalid_definition() {
        let err = ArgumentValidator::compile(&json!({ "type": 12 }))
            .expect_err("schema should not compile");
        assert_eq!(err.kind, ToolErrorKind::InvalidDefinition);
    }
}
