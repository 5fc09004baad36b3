// src/utils/password_policy.rs

use regex::Regex;
use std::sync::OnceLock;

/// Weak patterns rejected wherever they appear in the password.
const FORBIDDEN_SUBSTRINGS: &[&str] = &[
    "0123",
    "1234",
    "qwerty",
    "azerty",
    "password",
    "motdepasse",
];

/// Short generic runs rejected only when they make up the whole
/// alphanumeric content of the password ("Abcd!!" is weak, "Abcd123!" is
/// not reducible to a run).
const FORBIDDEN_EXACT: &[&str] = &["abcd", "abc", "aaaa"];

fn email_splitter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[@._\-]+").expect("static regex"))
}

/// Checks a candidate password against the signup policy.
///
/// Returns every violated rule, not just the first, so the client can show
/// the complete list. An empty vector means the password is acceptable.
pub fn validate_password(password: &str, nom: &str, email: &str) -> Vec<String> {
    let mut violations = Vec::new();

    if password.len() < 8 {
        violations.push("Le mot de passe doit contenir au moins 8 caractères".to_string());
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        violations.push("Le mot de passe doit contenir au moins une minuscule".to_string());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        violations.push("Le mot de passe doit contenir au moins une majuscule".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("Le mot de passe doit contenir au moins un chiffre".to_string());
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        violations.push("Le mot de passe doit contenir au moins un symbole".to_string());
    }

    let lowered = password.to_lowercase();

    if contains_personal_token(&lowered, nom, email) {
        violations
            .push("Le mot de passe ne doit pas contenir votre nom ou votre email".to_string());
    }

    if contains_weak_sequence(&lowered) {
        violations.push("Le mot de passe ressemble à une séquence trop courante".to_string());
    }

    violations
}

/// Tokens of length >= 3 derived from the email (split on `@ . _ -`) and the
/// name (split on whitespace) must not appear in the password.
fn contains_personal_token(lowered_password: &str, nom: &str, email: &str) -> bool {
    let email_lower = email.to_lowercase();
    let nom_lower = nom.to_lowercase();

    let email_tokens = email_splitter().split(&email_lower);
    let name_tokens = nom_lower.split_whitespace();

    email_tokens
        .chain(name_tokens)
        .filter(|t| t.len() >= 3)
        .any(|t| lowered_password.contains(t))
}

fn contains_weak_sequence(lowered_password: &str) -> bool {
    if FORBIDDEN_SUBSTRINGS
        .iter()
        .any(|s| lowered_password.contains(s))
    {
        return true;
    }

    let alphanumeric: String = lowered_password
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();

    FORBIDDEN_EXACT.iter().any(|s| alphanumeric == *s)
}
