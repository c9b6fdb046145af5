use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::auth::Service;

/// Failure reading or writing an API key in the system keyring.
///
/// A locked or missing keychain backend is recoverable: the key can still
/// come from the service's environment variable.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }

    /// One line telling the user how to supply the key for `service` anyway.
    pub fn hint_for(&self, service: Service) -> String {
        if self.is_recoverable() {
            format!(
                "The system keyring is unavailable ({}). Set {} instead.",
                self.inner(),
                service.env_var()
            )
        } else {
            format!(
                "Could not read the {} key from the keyring: {}",
                service.display_name(),
                self.inner()
            )
        }
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keyring access failed: {}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// Cloneable wrapper so one failure can be cached and reported per service.
#[derive(Clone, Debug)]
pub struct SharedKeyringAccessError(Arc<KeyringAccessError>);

impl SharedKeyringAccessError {
    pub fn new(error: KeyringAccessError) -> Self {
        Self(Arc::new(error))
    }

    pub fn is_recoverable(&self) -> bool {
        self.0.is_recoverable()
    }

    pub fn hint_for(&self, service: Service) -> String {
        self.0.hint_for(service)
    }
}

impl From<keyring::Error> for SharedKeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        Self::new(err.into())
    }
}

impl fmt::Display for SharedKeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Error for SharedKeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}
