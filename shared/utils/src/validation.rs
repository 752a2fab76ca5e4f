use crate::error::{BizGraphError, BizGraphResult};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a payload before it leaves the process.
///
/// `model` names the payload in the resulting error.
pub fn validate_model<T: Validate>(model: &str, value: &T) -> BizGraphResult<()> {
    match value.validate() {
        Ok(()) => Ok(()),
        Err(errors) => Err(BizGraphError::validation(model, format_validation_errors(&errors))),
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_messages("", errors, &mut messages);
    messages.sort();
    messages.join(", ")
}

fn collect_messages(prefix: &str, errors: &ValidationErrors, messages: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = match (&error.message, error.code.as_ref()) {
                        (Some(message), _) => message.to_string(),
                        (None, "email") => "Invalid email format".to_string(),
                        (None, "length") => {
                            format!("Length validation failed for field '{}'", path)
                        }
                        (None, "range") => format!("Value out of range for field '{}'", path),
                        (None, "required") => format!("Field '{}' is required", path),
                        (None, code) => format!("Validation failed for field '{}': {}", path, code),
                    };
                    messages.push(message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(&path, nested, messages),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(&format!("{}[{}]", path, index), nested, messages);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizgraph_models::{AccountType, GenerationConfig, NewAccount, StatusWeights};

    #[test]
    fn test_valid_account_passes() {
        let account = NewAccount {
            name: "Northwind Heating".to_string(),
            account_type: AccountType::Commercial,
            address: "12 Elm St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            notes: None,
        };
        assert!(validate_model("account", &account).is_ok());
    }

    #[test]
    fn test_invalid_account_reports_field() {
        let account = NewAccount {
            name: String::new(),
            account_type: AccountType::Commercial,
            address: "12 Elm St".to_string(),
            city: "Springfield".to_string(),
            state: "Illinois".to_string(),
            zip: "62701".to_string(),
            notes: None,
        };

        let err = validate_model("account", &account).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        let text = err.to_string();
        assert!(text.contains("Account name is required"));
        assert!(text.contains("State must be a two-letter code"));
    }

    #[test]
    fn test_weight_messages_surface() {
        let mut config = GenerationConfig::default();
        config.quote_status_weights = StatusWeights::new(vec![]);

        let err = validate_model("generation config", &config).unwrap_err();
        assert!(err.to_string().contains("quote status weights are empty"));
    }
}
