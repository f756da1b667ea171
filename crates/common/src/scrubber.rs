use once_cell::sync::Lazy;
use regex::Regex;

/// Credential scrubber for engine error messages and logged SQL.
///
/// Regex-based and best-effort: it catches the token shapes the engine API and
/// service accounts produce, not arbitrary secrets embedded in free text.
static BEARER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+").unwrap());

static OAUTH_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Google OAuth2 access tokens start with ya29.
    Regex::new(r"\bya29\.[A-Za-z0-9._-]+").unwrap()
});

static PRIVATE_KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-----BEGIN [A-Z ]*PRIVATE KEY-----[\s\S]*?-----END [A-Z ]*PRIVATE KEY-----")
        .unwrap()
});

static KEY_VALUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)("?(?:access_token|refresh_token|client_secret|private_key|api_key)"?\s*[:=]\s*)"?[^"\s,&}]+"?"#)
        .unwrap()
});

pub fn scrub(input: &str) -> String {
    let mut scrubbed = PRIVATE_KEY_REGEX
        .replace_all(input, "[PRIVATE_KEY]")
        .to_string();

    scrubbed = BEARER_REGEX
        .replace_all(&scrubbed, "Bearer [REDACTED]")
        .to_string();

    scrubbed = OAUTH_TOKEN_REGEX
        .replace_all(&scrubbed, "[REDACTED]")
        .to_string();

    scrubbed = KEY_VALUE_REGEX
        .replace_all(&scrubbed, "${1}[REDACTED]")
        .to_string();

    scrubbed
}
