//! Registration password policy
//!
//! Rules are checked in order and the first failure is reported.

/// Why a password was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordRejection {
    #[error("Password must be at least 8 characters long.")]
    TooShort,

    #[error("Password must contain at least 3 of the following: uppercase letter, lowercase letter, number, special character.")]
    NotComplex,

    #[error("Password cannot contain your name.")]
    ContainsName,

    #[error("Password cannot contain your email address.")]
    ContainsEmail,

    #[error("This password is too common. Please choose a stronger password.")]
    TooCommon,

    #[error("Password cannot contain simple patterns or sequences.")]
    SimplePattern,

    #[error("Password cannot contain more than 3 consecutive identical characters.")]
    RepeatedCharacters,

    #[error("Password cannot contain sequential characters (e.g., 1234, abcd).")]
    Sequential,
}

pub const MIN_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password123", "123456", "12345678", "123456789", "1234567890", "qwerty",
    "qwertyui", "qwertyuiop", "abc123", "abcd1234", "password1", "letmein", "welcome", "monkey",
    "1234", "12345", "111111", "000000", "admin", "admin123", "root", "pass", "pass123", "test",
    "test123", "user", "user123", "hello", "hello123", "welcome123", "trustno1", "dragon",
    "master", "sunshine", "princess", "football", "shadow", "michael", "jennifer", "computer",
    "baseball", "jordan", "harley",
];

const SYMBOLS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

const KEYBOARD_RUNS: &[&str] = &[
    "qwe", "wer", "ert", "rty", "tyu", "yui", "uio", "iop", "asd", "sdf", "dfg", "fgh", "ghj",
    "hjk", "jkl", "zxc", "xcv", "cvb", "vbn", "bnm",
];

pub fn validate_password(password: &str, name: &str, email: &str) -> Result<(), PasswordRejection> {
    if password.chars().count() < MIN_LENGTH {
        return Err(PasswordRejection::TooShort);
    }

    let classes = [
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| SYMBOLS.contains(c)),
    ];
    if classes.iter().filter(|present| **present).count() < 3 {
        return Err(PasswordRejection::NotComplex);
    }

    let lower = password.to_lowercase();

    let name_lower = name.to_lowercase();
    if name_lower
        .split(' ')
        .any(|part| part.chars().count() > 2 && lower.contains(part))
    {
        return Err(PasswordRejection::ContainsName);
    }

    let email_lower = email.to_lowercase();
    let local_part = email_lower.split('@').next().unwrap_or_default();
    if local_part.chars().count() > 3 && lower.contains(local_part) {
        return Err(PasswordRejection::ContainsEmail);
    }

    if COMMON_PASSWORDS.contains(&lower.as_str()) {
        return Err(PasswordRejection::TooCommon);
    }

    if has_simple_pattern(&lower) {
        return Err(PasswordRejection::SimplePattern);
    }

    if has_identical_run(password, 4) {
        return Err(PasswordRejection::RepeatedCharacters);
    }

    if has_sequential_run(password, 4) {
        return Err(PasswordRejection::Sequential);
    }

    Ok(())
}

/// Single repeated character, or a leading digit pair, letter pair, or
/// keyboard run.
fn has_simple_pattern(lower: &str) -> bool {
    let chars: Vec<char> = lower.chars().collect();
    if chars.len() > 1 && chars.iter().all(|c| *c == chars[0]) {
        return true;
    }

    if let &[a, b, ..] = chars.as_slice() {
        if a.is_ascii_digit() && b.is_ascii_digit() {
            let (x, y) = (a as u8 - b'0', b as u8 - b'0');
            if y == (x + 1) % 10 {
                return true;
            }
        }
        if a.is_ascii_lowercase() && b.is_ascii_lowercase() && (b as u8) == (a as u8) + 1 {
            return true;
        }
    }

    KEYBOARD_RUNS.iter().any(|run| lower.starts_with(run))
}

fn has_identical_run(password: &str, len: usize) -> bool {
    let chars: Vec<char> = password.chars().collect();
    chars
        .windows(len)
        .any(|w| w.iter().all(|c| *c == w[0]))
}

fn has_sequential_run(password: &str, len: usize) -> bool {
    let codes: Vec<i64> = password.chars().map(|c| c as i64).collect();
    codes.windows(len).any(|w| {
        let ascending = w.windows(2).all(|p| p[1] == p[0] + 1);
        let descending = w.windows(2).all(|p| p[1] == p[0] - 1);
        ascending || descending
    })
}
