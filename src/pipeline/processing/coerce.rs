use std::collections::HashSet;

/// Decides which raw cells count as null
#[derive(Debug, Clone)]
pub struct NullPolicy {
    tokens: HashSet<String>,
}

impl NullPolicy {
    pub fn new<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.as_ref().trim().to_string()).collect(),
        }
    }

    /// The trimmed cell, or `None` when it is blank or a null token
    pub fn cell<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || self.tokens.contains(trimmed) {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// Integers, also accepting the `5.0` form spreadsheets and dataframe exports produce
pub fn parse_int(value: &str) -> Option<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let (whole, frac) = value.split_once('.')?;
    if !frac.is_empty() && frac.chars().all(|c| c == '0') {
        whole.parse::<i64>().ok()
    } else {
        None
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_tokens_are_null() {
        let policy = NullPolicy::new(&["NA", "null"]);
        assert_eq!(policy.cell(""), None);
        assert_eq!(policy.cell("   "), None);
        assert_eq!(policy.cell(" NA "), None);
        assert_eq!(policy.cell("null"), None);
        assert_eq!(policy.cell("Null"), Some("Null"));
        assert_eq!(policy.cell(" 42 "), Some("42"));
    }

    #[test]
    fn integers() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("-7"), Some(-7));
        assert_eq!(parse_int("5.0"), Some(5));
        assert_eq!(parse_int("5.00"), Some(5));
        assert_eq!(parse_int("5.5"), None);
        assert_eq!(parse_int("5."), None);
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
