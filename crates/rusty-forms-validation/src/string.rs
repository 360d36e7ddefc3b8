//! Length checks used by the `min_length` / `max_length` rules
//!
//! Lengths count characters, not bytes, so `"ñandú"` has length 5.

/// Validates minimum length
pub fn validate_min_length(len: usize, min: usize) -> Result<(), String> {
    if len >= min {
        Ok(())
    } else {
        Err(format!("Must be at least {} characters", min))
    }
}

/// Validates maximum length
pub fn validate_max_length(len: usize, max: usize) -> Result<(), String> {
    if len <= max {
        Ok(())
    } else {
        Err(format!("Must be at most {} characters", max))
    }
}

/// Character count of a string
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_validators() {
        assert!(validate_min_length(char_len("hello"), 3).is_ok());
        assert!(validate_min_length(char_len("hi"), 3).is_err());

        assert!(validate_max_length(char_len("hello"), 10).is_ok());
        assert!(validate_max_length(char_len("verylongstring"), 5).is_err());
    }

    #[test]
    fn test_char_len_counts_characters() {
        assert_eq!(char_len("ñandú"), 5);
        assert_eq!(char_len(""), 0);
    }
}
