//! Instruction text and response schema sent with every request.

use serde_json::{json, Value};

/// Name attached to the strict response schema.
pub const SCHEMA_NAME: &str = "invoice_fields";

const BASE_INSTRUCTION: &str = "\
You read Japanese invoices, receipts and bills and report four fields as a JSON object.

Fields:
- amount: the total amount billed, as an integer in whole yen. Keep every digit: \
read grouping separators such as 1,234,567 carefully and never drop a group.
- date: the transaction or issue date as YYYYMMDD. Convert era dates (e.g. 令和6年) to the Gregorian year.
- trading_partner: the counter-party of the document, never its issuer. \
On an invoice this is the addressee, usually followed by 御中 or 様. \
On a handwritten receipt the counter-party is written near the top.";

const REGISTRATION_INSTRUCTION: &str = "
- invoice_registration_number: the qualified invoice registration number: the letter T \
followed by 13 digits. Do not confuse it with the invoice number, a phone number or a postal code.";

const CLOSING_INSTRUCTION: &str = "

If a field is missing, illegible or ambiguous, set it to null. Never guess. \
Answer with the JSON object only.";

/// Instruction text, optionally asking for the registration number.
pub fn instruction(request_registration_number: bool) -> String {
    let mut text = String::from(BASE_INSTRUCTION);
    if request_registration_number {
        text.push_str(REGISTRATION_INSTRUCTION);
    }
    text.push_str(CLOSING_INSTRUCTION);
    text
}

/// Strict JSON schema for the response; every field is nullable.
pub fn response_schema(request_registration_number: bool) -> Value {
    let mut properties = json!({
        "amount": { "type": ["integer", "null"], "description": "Total amount in whole yen" },
        "date": { "type": ["string", "null"], "description": "Transaction date as YYYYMMDD" },
        "trading_partner": { "type": ["string", "null"], "description": "Counter-party name" },
    });
    let mut required = vec!["amount", "date", "trading_partner"];

    if request_registration_number {
        properties["invoice_registration_number"] = json!({
            "type": ["string", "null"],
            "description": "T followed by 13 digits",
        });
        required.push("invoice_registration_number");
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}
