//! Password lookup from the process environment.
//!
//! Passwords are read on every call rather than cached at startup, so a
//! missing variable surfaces on first use.

use std::fmt;
use subtle::ConstantTimeEq;

/// Environment variable holding the public-tier password.
pub const PUBLIC_PASSWORD_VAR: &str = "BIRTHDAY_PAGE_PASSWORD";

/// Environment variable holding the admin-tier password.
pub const ADMIN_PASSWORD_VAR: &str = "BIRTHDAY_PAGE_ADMIN_PASSWORD";

/// Access tier. Each tier has its own password and login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    Public,
    Admin,
}

impl SecretKind {
    pub const ALL: [SecretKind; 2] = [SecretKind::Public, SecretKind::Admin];

    pub fn env_var(self) -> &'static str {
        match self {
            SecretKind::Public => PUBLIC_PASSWORD_VAR,
            SecretKind::Admin => ADMIN_PASSWORD_VAR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SecretKind::Public => "public",
            SecretKind::Admin => "admin",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret lookup errors. These are server misconfiguration, not client errors.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Required environment variable {var} is not set")]
    Missing { var: &'static str },
}

/// Read the password for `kind` from the environment.
/// An empty value is treated as unset.
pub fn get_secret_password(kind: SecretKind) -> Result<String, SecretError> {
    let var = kind.env_var();
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(SecretError::Missing { var }),
    }
}

/// Where request handling gets passwords from.
pub trait SecretSource: Send + Sync {
    fn secret(&self, kind: SecretKind) -> Result<String, SecretError>;
}

/// Reads passwords from the process environment on each call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn secret(&self, kind: SecretKind) -> Result<String, SecretError> {
        get_secret_password(kind)
    }
}

/// Check `submitted` against every tier. Returns the matching tier, if any.
///
/// All tiers are resolved before comparing, so a missing variable fails the
/// request even when another tier would have matched.
pub fn verify_password(
    source: &dyn SecretSource,
    submitted: &str,
) -> Result<Option<SecretKind>, SecretError> {
    let mut secrets = Vec::with_capacity(SecretKind::ALL.len());
    for kind in SecretKind::ALL {
        secrets.push((kind, source.secret(kind)?));
    }

    let mut matched = None;
    for (kind, secret) in &secrets {
        let eq: bool = secret.as_bytes().ct_eq(submitted.as_bytes()).into();
        if eq && matched.is_none() {
            matched = Some(*kind);
        }
    }
    Ok(matched)
}
