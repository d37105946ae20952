//! Structural check used to tell provider-issued user ids apart from emails.

use regex::Regex;
use std::sync::LazyLock;

/// Length of a provider-issued user id
pub const UID_LEN: usize = 28;

static UID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{28}$").expect("valid uid pattern"));

/// Whether `s` looks like a user id: exactly 28 ASCII letters or digits.
///
/// This is a guess based on shape only. A string that passes may still not
/// belong to any registered user.
pub fn is_valid_uid(s: &str) -> bool {
    UID_PATTERN.is_match(s)
}
