use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating document ids typed into admin forms
    /// - Valid: "5f1c2b9e8a", "faq_01", "a-b"
    /// - Invalid: "", "a b", "a/b", "a,b"
    pub static ref OBJECT_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_regex_valid() {
        assert!(OBJECT_ID_REGEX.is_match("5f1c2b9e8a0d"));
        assert!(OBJECT_ID_REGEX.is_match("faq_01"));
        assert!(OBJECT_ID_REGEX.is_match("a-b"));
    }

    #[test]
    fn test_object_id_regex_invalid() {
        assert!(!OBJECT_ID_REGEX.is_match("")); // empty
        assert!(!OBJECT_ID_REGEX.is_match("a b")); // space
        assert!(!OBJECT_ID_REGEX.is_match("a/b")); // path separator
        assert!(!OBJECT_ID_REGEX.is_match("a,b")); // list separator
    }
}
