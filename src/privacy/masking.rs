//! Deterministic, non-reversible masking strategies.
//!
//! The strategy is picked from the field name, not from the value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(1[89]\d{2}|2\d{3})\b").expect("Failed to compile year regex"));

const FULL_MASK: &str = "***";

/// `john.doe@example.com` becomes `j***@example.com`.
pub fn mask_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        _ => mask_generic(email),
    }
}

/// Digits only, rendered as `***-***-` plus the last four digits.
/// Fewer than four digits masks the whole value.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return FULL_MASK.to_string();
    }
    let last_four: String = digits[digits.len() - 4..].iter().collect();
    format!("***-***-{}", last_four)
}

/// Keep the year, hide month and day: `1985-06-15` becomes `1985-**-**`.
pub fn mask_date(date: &str) -> String {
    match YEAR_RE.captures(date).and_then(|c| c.get(1)) {
        Some(year) => format!("{}-**-**", year.as_str()),
        None => mask_generic(date),
    }
}

/// First char + `***` + last char; two characters or fewer become `***`.
pub fn mask_generic(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 2 {
        return FULL_MASK.to_string();
    }
    format!("{}***{}", chars[0], chars[chars.len() - 1])
}

/// Keep only the trailing comma-separated segments (city/state level).
pub fn mask_address(address: &str) -> String {
    let segments: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    match segments.len() {
        0 | 1 => FULL_MASK.to_string(),
        2 => segments[1].to_string(),
        n => segments[n - 2..].join(", "),
    }
}

/// Mask a JSON value for a sensitive field. Strings and numbers are masked,
/// arrays element-wise, null is kept, anything else is replaced wholesale.
pub fn mask_value(field: &str, value: &Value, is_address: bool) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(mask_text(field, s, is_address)),
        Value::Number(n) => Value::String(mask_text(field, &n.to_string(), is_address)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| mask_value(field, item, is_address))
                .collect(),
        ),
        _ => Value::String(FULL_MASK.to_string()),
    }
}

fn mask_text(field: &str, text: &str, is_address: bool) -> String {
    if is_address {
        return mask_address(text);
    }
    let field = field.to_ascii_lowercase();
    if field.contains("email") {
        mask_email(text)
    } else if field.contains("phone") || field.contains("mobile") || field.contains("fax") {
        mask_phone(text)
    } else if field.contains("birth") || field.contains("dob") || field.contains("date") {
        mask_date(text)
    } else {
        mask_generic(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("john.doe@example.com"), "j***@example.com");
        assert_eq!(mask_email("a@b.io"), "a***@b.io");
        assert_eq!(mask_email("not-an-email"), "n***l");
    }

    #[test]
    fn test_mask_phone_keeps_last_four() {
        assert_eq!(mask_phone("(555) 123-4567"), "***-***-4567");
        assert_eq!(mask_phone("+1 555 123 4567"), "***-***-4567");
        assert_eq!(mask_phone("123"), "***");
    }

    #[test]
    fn test_mask_date_keeps_year() {
        assert_eq!(mask_date("1985-06-15"), "1985-**-**");
        assert_eq!(mask_date("06/15/1985"), "1985-**-**");
        assert_eq!(mask_date("sometime"), "s***e");
    }

    #[test]
    fn test_mask_generic() {
        assert_eq!(mask_generic("123-45-6789"), "1***9");
        assert_eq!(mask_generic("ab"), "***");
        assert_eq!(mask_generic(""), "***");
    }

    #[test]
    fn test_mask_address() {
        assert_eq!(
            mask_address("123 Main St, Springfield, IL 62704"),
            "Springfield, IL 62704"
        );
        assert_eq!(mask_address("123 Main St, Springfield"), "Springfield");
        assert_eq!(mask_address("123 Main St"), "***");
    }

    #[test]
    fn test_mask_value_dispatch() {
        assert_eq!(
            mask_value("work_email", &json!("jane@corp.com"), false),
            json!("j***@corp.com")
        );
        assert_eq!(
            mask_value("mobile", &json!(5551234567u64), false),
            json!("***-***-4567")
        );
        assert_eq!(
            mask_value("date_of_birth", &json!("1990-01-02"), false),
            json!("1990-**-**")
        );
        assert_eq!(mask_value("ssn", &Value::Null, false), Value::Null);
        assert_eq!(
            mask_value("phone", &json!(["555-123-4567", "12"]), false),
            json!(["***-***-4567", "***"])
        );
    }
}
