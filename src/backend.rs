//! Backend selection module.
//!
//! This module defines the available computation backends for the
//! convolution ops and provides functions to set and get the current one.
//!
//! # Supported Backends
//!
//! - `Cpu` — Rayon-parallel kernels over output planes (default).
//! - `Reference` — Single-threaded nested loops, kept as a readable oracle.
//!
//! The backend is stored globally using an `AtomicU8`, enabling fast
//! switching at runtime. Demo programs read it from the
//! `DILATION_PRIMER_BACKEND` environment variable via [`Backend::from_env`].

use core::convert::TryFrom;
use core::str::FromStr;
use core::sync::atomic::{AtomicU8, Ordering};

/// Name of the environment variable consulted by [`Backend::from_env`].
pub const BACKEND_ENV: &str = "DILATION_PRIMER_BACKEND";

/// Enumeration of supported computation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Backend {
    /// Parallel CPU backend (default).
    #[default]
    Cpu = 0,
    /// Sequential reference implementation.
    Reference,
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cpu),
            1 => Ok(Self::Reference),
            _ => Err(()),
        }
    }
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "reference" | "ref" => Ok(Self::Reference),
            _ => Err(()),
        }
    }
}

impl Backend {
    /// Reads [`BACKEND_ENV`], falling back to the default when unset or unknown.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(BACKEND_ENV).ok().as_deref())
    }

    /// Interprets a raw [`BACKEND_ENV`] value; `None` means the variable is unset.
    ///
    /// Unknown names log a warning and select the default.
    ///
    /// ```
    /// use dilation_primer::backend::Backend;
    /// assert_eq!(Backend::from_env_value(Some("REFERENCE")), Backend::Reference);
    /// assert_eq!(Backend::from_env_value(Some("bogus")), Backend::Cpu);
    /// ```
    pub fn from_env_value(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        raw.parse().unwrap_or_else(|()| {
            tracing::warn!(value = %raw, "unknown {BACKEND_ENV}, using the default backend");
            Self::default()
        })
    }
}

/// Internal global state for the active backend.
///
/// Expected to be set once at startup, before any op runs.
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Cpu as u8);

/// Sets the active backend to use for tensor computation.
///
/// # Example
///
/// ```
/// use dilation_primer::backend::{get_backend, set_backend, Backend};
/// set_backend(Backend::Reference);
/// assert_eq!(get_backend(), Backend::Reference);
/// set_backend(Backend::Cpu);
/// ```
pub fn set_backend(b: Backend) {
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the currently active computation backend.
///
/// If the stored value is invalid, defaults to [`Backend::Cpu`].
pub fn get_backend() -> Backend {
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}
