//! Input validation for account workflows.
//!
//! Every profile starts from a fresh [`Validator`] and runs a subset of the
//! field rules, so several independent field errors can be reported at once.

use crate::validator::{length_between, Validator};

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 25;

/// Minimum password length in bytes.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in bytes.
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Symbols accepted by the password policy.
pub const PASSWORD_SYMBOLS: &[char] = &['#', '?', '!', '@', '$', '%', '^', '&', '*', '_', '\\', '-'];

const PASSWORD_MESSAGE: &str = "must be 8-72 characters long and contain at least one uppercase letter, one lowercase letter, one number, and one symbol";

/// True when `password` satisfies the password policy.
pub fn password_meets_policy(password: &str) -> bool {
    length_between(password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(&c))
}

/// True when `email` looks like `local@domain.tld`.
///
/// Local part: letters, digits and `._%+-`. Domain: letters, digits, `.` and
/// `-`, ending in a dot followed by at least two letters.
pub fn email_is_well_formed(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return false;
    }

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Username rules.
pub fn check_username(v: &mut Validator, username: &str) {
    v.check(!username.is_empty(), "username", "must be provided");
    v.check(
        length_between(username, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH),
        "username",
        "must be 3-25 characters long",
    );
    v.check(
        username.chars().all(|c| c.is_ascii_alphanumeric()),
        "username",
        "must contain only letters and numbers",
    );
}

/// Email rules.
pub fn check_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(
        email_is_well_formed(email),
        "email",
        "must be a valid email address",
    );
}

/// Password rules; an absent password is skipped.
pub fn check_password(v: &mut Validator, password: Option<&str>) {
    if let Some(password) = password {
        v.check(password_meets_policy(password), "password", PASSWORD_MESSAGE);
    }
}

/// Full registration profile: username, email and password.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Validator {
    let mut v = Validator::new();
    check_username(&mut v, username);
    check_email(&mut v, email);
    check_password(&mut v, Some(password));
    v
}

/// Login profile: username and password.
pub fn validate_login(username: &str, password: &str) -> Validator {
    let mut v = Validator::new();
    check_username(&mut v, username);
    check_password(&mut v, Some(password));
    v
}

/// Email-only profile.
pub fn validate_email_only(email: &str) -> Validator {
    let mut v = Validator::new();
    check_email(&mut v, email);
    v
}

/// Password-only profile.
pub fn validate_password_only(password: &str) -> Validator {
    let mut v = Validator::new();
    check_password(&mut v, Some(password));
    v
}

/// Update profile: each field is checked only when present.
pub fn validate_update(email: Option<&str>, password: Option<&str>) -> Validator {
    let mut v = Validator::new();
    if let Some(email) = email {
        check_email(&mut v, email);
    }
    check_password(&mut v, password);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        let v = validate_login("alice", "Abcdef1!");
        assert!(v.is_valid());

        let v = validate_login("", "Abcdef1!");
        assert_eq!(v.get("username"), Some("must be provided"));

        let v = validate_login("ab", "Abcdef1!");
        assert_eq!(v.get("username"), Some("must be 3-25 characters long"));

        let v = validate_login(&"a".repeat(26), "Abcdef1!");
        assert_eq!(v.get("username"), Some("must be 3-25 characters long"));

        let v = validate_login("john_doe", "Abcdef1!");
        assert_eq!(
            v.get("username"),
            Some("must contain only letters and numbers")
        );
    }

    #[test]
    fn test_username_exact_lengths() {
        assert!(validate_login("abc", "Abcdef1!").is_valid());
        assert!(validate_login(&"a".repeat(25), "Abcdef1!").is_valid());
    }

    #[test]
    fn test_email_rules() {
        assert!(email_is_well_formed("bob@example.com"));
        assert!(email_is_well_formed("first.last+tag@mail.example.co"));
        assert!(!email_is_well_formed("bob"));
        assert!(!email_is_well_formed("@example.com"));
        assert!(!email_is_well_formed("bob@example"));
        assert!(!email_is_well_formed("bob@example.c"));
        assert!(!email_is_well_formed("bob@.com"));
        assert!(!email_is_well_formed("bob smith@example.com"));
        assert!(!email_is_well_formed("bob@exa mple.com"));

        let v = validate_email_only("");
        assert_eq!(v.get("email"), Some("must be provided"));

        let v = validate_email_only("nope");
        assert_eq!(v.get("email"), Some("must be a valid email address"));
    }

    #[test]
    fn test_password_policy() {
        assert!(password_meets_policy("Abcdef1!"));
        assert!(password_meets_policy("Zz9\\zzzz"));
        assert!(!password_meets_policy("Abcde1!"));
        assert!(!password_meets_policy("abcdef1!"));
        assert!(!password_meets_policy("ABCDEF1!"));
        assert!(!password_meets_policy("Abcdefg!"));
        assert!(!password_meets_policy("Abcdefg1"));
        assert!(!password_meets_policy("Abcdef1~"));

        let max = format!("Aa1!{}", "a".repeat(68));
        assert_eq!(max.len(), 72);
        assert!(password_meets_policy(&max));
        let over = format!("{max}a");
        assert!(!password_meets_policy(&over));
    }

    #[test]
    fn test_registration_reports_every_field() {
        let v = validate_registration("a!", "bad", "weak");
        assert_eq!(v.len(), 3);
        assert!(v.get("username").is_some());
        assert!(v.get("email").is_some());
        assert!(v.get("password").is_some());
    }

    #[test]
    fn test_update_skips_absent_fields() {
        assert!(validate_update(None, None).is_valid());
        assert!(validate_update(Some("bob@example.com"), None).is_valid());
        assert!(validate_update(None, Some("Abcdef1!")).is_valid());

        let v = validate_update(None, Some("weak"));
        assert!(v.get("password").is_some());
        assert!(v.get("email").is_none());
    }

    #[test]
    fn test_update_present_but_empty_is_checked() {
        let v = validate_update(Some(""), Some(""));
        assert_eq!(v.get("email"), Some("must be provided"));
        assert!(v.get("password").is_some());
    }

    #[test]
    fn test_password_only() {
        assert!(validate_password_only("Abcdef1!").is_valid());
        assert!(!validate_password_only("abc").is_valid());
    }
}
