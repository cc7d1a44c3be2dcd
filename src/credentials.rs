use std::fmt;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::error::Result;
use crate::error::WorkflowError;

/// An opaque bearer token for the remote API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trim surrounding whitespace; reject empty tokens.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(WorkflowError::validation("No token provided"));
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

/// Process-wide holder of the single live credential.
///
/// Concurrent `authenticate` calls are last-write-wins. Readers take a
/// snapshot, so a credential swapped mid-request does not affect calls
/// already in flight.
#[derive(Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new credential, replacing any existing one.
    pub fn authenticate(&self, token: &str) -> Result<()> {
        let credential = Credential::parse(token)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
        Ok(())
    }

    pub fn logout(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn current(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
