//! Username and email collision renaming.

/// Upper bound on rename attempts for one row.
pub const MAX_SUFFIX_ATTEMPTS: usize = 100;

/// Canonical form used by the destination's unique username index:
/// trimmed, internal whitespace collapsed, lowercased.
pub fn normalize_username(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical form of an email address: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Next candidate for a colliding username: `name` -> `name.2`,
/// `name.2` -> `name.3`.
pub fn next_username(current: &str) -> String {
    match split_suffix(current, '.') {
        Some((base, n)) => format!("{}.{}", base, n + 1),
        None => format!("{}.2", current),
    }
}

/// Next candidate for a colliding email: `a@b` -> `a+2@b`, `a+2@b` ->
/// `a+3@b`. Without a usable domain: `x` -> `x.n2.local` -> `x.n3.local`.
pub fn next_email(current: &str) -> String {
    if let Some((stem, digits)) = current
        .strip_suffix(".local")
        .and_then(|base| base.rsplit_once(".n"))
    {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = digits.parse::<u32>() {
                return format!("{}.n{}.local", stem, n + 1);
            }
        }
    }

    match current.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            match split_suffix(local, '+') {
                Some((base, n)) => format!("{}+{}@{}", base, n + 1, domain),
                None => format!("{}+2@{}", local, domain),
            }
        }
        _ => format!("{}.n2.local", current),
    }
}

/// Split `base{sep}N` into `(base, N)` when N is a number ≥ 2.
fn split_suffix(value: &str, sep: char) -> Option<(&str, u32)> {
    let (base, digits) = value.rsplit_once(sep)?;
    if base.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = digits.parse().ok()?;
    (n >= 2).then_some((base, n))
}
