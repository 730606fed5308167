//! Upload credential resolution.
//!
//! Each export is routed to exactly one image-API key. Callers name an
//! account (free-form, e.g. `"ACME Corp"`); the name is normalized and must
//! match a configured `[[accounts]]` binding. With no account named, the
//! configured default key is used, then the first configured binding.
//!
//! Bindings are read-only configuration, so concurrent exports share them
//! without locking.

use thiserror::Error;

use crate::config::AccountBinding;

/// Account id reported when the default key (not a binding) is used.
pub const DEFAULT_ACCOUNT_ID: &str = "default";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialError {
    #[error(
        "no upload credential for account \"{account}\": expected an [[accounts]] entry with id = \"{account}\""
    )]
    UnknownAccount { account: String },
    #[error("no upload credential configured: set upload.default_key or add an [[accounts]] entry")]
    NoneConfigured,
}

/// The credential selected for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub account_id: String,
    pub key: String,
}

/// Normalize a free-form account name into a binding id.
///
/// Lowercases, turns whitespace runs into `-`, drops anything outside
/// `[a-z0-9_-]`, and trims leading/trailing dashes:
/// `"ACME Corp!"` → `"acme-corp"`.
pub fn normalize_account_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
            if pending_dash {
                out.push('-');
                pending_dash = false;
            }
            out.push(c);
        }
    }
    out.trim_matches('-').to_string()
}

/// Pick the credential for an invocation. See the [module docs](self).
pub fn resolve_credential(
    account: Option<&str>,
    accounts: &[AccountBinding],
    default_key: Option<&str>,
) -> Result<ResolvedCredential, CredentialError> {
    let wanted = account.map(normalize_account_id).unwrap_or_default();
    let mut usable = accounts.iter().filter(|binding| !binding.key.is_empty());

    if !wanted.is_empty() {
        return usable
            .find(|binding| normalize_account_id(&binding.id) == wanted)
            .map(|binding| ResolvedCredential {
                account_id: wanted.clone(),
                key: binding.key.clone(),
            })
            .ok_or(CredentialError::UnknownAccount { account: wanted });
    }

    if let Some(key) = default_key.filter(|key| !key.is_empty()) {
        return Ok(ResolvedCredential {
            account_id: DEFAULT_ACCOUNT_ID.to_string(),
            key: key.to_string(),
        });
    }

    usable
        .next()
        .map(|binding| ResolvedCredential {
            account_id: normalize_account_id(&binding.id),
            key: binding.key.clone(),
        })
        .ok_or(CredentialError::NoneConfigured)
}
