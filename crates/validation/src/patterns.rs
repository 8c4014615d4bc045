//! Pattern and date-format constants shared by the record rulesets.

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DATE_PATTERN: &str = r"^(\d{4}-\d{2}-\d{2})$";
pub const DATETIME_PATTERN: &str = r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})$";

/// Free-text value up to `max_len` characters.
pub fn text_pattern(max_len: usize) -> String {
    format!(
        r#"^([\w\s!@#$%^&*()+\-=\[\]{{}};:"\|,.<>/?'"]{{1,{max_len}}})$"#
    )
}

/// Free text restricted to a conservative punctuation set.
pub fn strict_text_pattern(max_len: usize) -> String {
    format!(r#"^([\w\s()+\-:",.?'"]{{1,{max_len}}})$"#)
}

/// Unsigned integer with at most `max_digits` digits.
pub fn num_pattern(max_digits: usize) -> String {
    format!(r"^\d{{1,{max_digits}}}$")
}
