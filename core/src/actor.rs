//! Actor names as they arrive from chat.
//!
//! An actor is either a platform mention (`<@123>` or the nickname form
//! `<@!123>`, both stored as `<@123>`) or a plain alphanumeric name of at
//! most 32 characters.

use crate::{
    error::{LedgerError, LedgerResult},
    types::Actor,
};

pub const MAX_NAME_LEN: usize = 32;

/// The numeric user id inside a mention, if `raw` is one.
pub fn mention_id(raw: &str) -> Option<&str> {
    let inner = raw.strip_prefix("<@")?.strip_suffix('>')?;
    let id = inner.strip_prefix('!').unwrap_or(inner);
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
}

pub fn is_mention(raw: &str) -> bool {
    mention_id(raw).is_some()
}

/// Validate and canonicalise an actor.
pub fn normalize(raw: &str) -> LedgerResult<Actor> {
    let raw = raw.trim();
    if let Some(id) = mention_id(raw) {
        return Ok(format!("<@{id}>"));
    }
    let valid = !raw.is_empty()
        && raw.chars().count() <= MAX_NAME_LEN
        && raw.chars().all(char::is_alphanumeric);
    if !valid {
        return Err(LedgerError::Validation(
            "Invalid username format. Use only letters and numbers or mention a user.".into(),
        ));
    }
    Ok(raw.to_string())
}

/// Canonical form for lookups; falls back to the trimmed input.
pub fn canonical(raw: &str) -> Actor {
    normalize(raw).unwrap_or_else(|_| raw.trim().to_string())
}

/// How an actor is shown in chat: mentions as-is, names with an `@`.
pub fn display(actor: &str) -> String {
    if is_mention(actor) {
        actor.to_string()
    } else {
        format!("@{actor}")
    }
}
