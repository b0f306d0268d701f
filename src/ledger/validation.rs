//! Turns untyped deposit and withdrawal requests into validated commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::ValidationErrors, ledger_entry::MAX_DESCRIPTION_LENGTH, money::Amount};

/// The body of a deposit or withdrawal request as sent by a client.
///
/// `amount` may be a JSON string such as `"20.50"` or a JSON number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// The amount to move.
    #[serde(default)]
    pub amount: Option<Value>,
    /// An optional note for the ledger entry.
    #[serde(default)]
    pub description: Option<String>,
}

/// A deposit or withdrawal that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionCommand {
    /// The amount to move.
    pub amount: Amount,
    /// The note for the ledger entry, if one was given.
    pub description: Option<String>,
}

/// Check every field of `request`.
///
/// # Errors
/// Returns all the problems found, keyed by field name.
pub fn validate_transaction_request(
    request: &TransactionRequest,
) -> Result<TransactionCommand, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let amount = match &request.amount {
        None | Some(Value::Null) => {
            errors.add("amount", "This field is required.");
            None
        }
        Some(Value::String(text)) => parse_amount(text, &mut errors),
        Some(Value::Number(number)) => parse_amount(&number.to_string(), &mut errors),
        Some(_) => {
            errors.add("amount", "A valid number is required.");
            None
        }
    };

    if let Some(description) = &request.description
        && description.trim().chars().count() > MAX_DESCRIPTION_LENGTH
    {
        errors.add(
            "description",
            format!("Ensure this field has no more than {MAX_DESCRIPTION_LENGTH} characters."),
        );
    }

    match amount {
        Some(amount) if errors.is_empty() => Ok(TransactionCommand {
            amount,
            description: request.description.clone(),
        }),
        _ => Err(errors),
    }
}

fn parse_amount(text: &str, errors: &mut ValidationErrors) -> Option<Amount> {
    Amount::parse(text)
        .map_err(|error| errors.add("amount", error.to_string()))
        .ok()
}
