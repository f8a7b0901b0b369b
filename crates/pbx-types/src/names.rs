//! Validation of caller-supplied path components.
//!
//! Party ids, object names and queue names each become exactly one directory
//! entry on disk. A valid component:
//! - Must be non-empty and at most 255 bytes
//! - Must not contain `/`, `\`, NUL, or line breaks
//! - Must not start with `.` (hidden names are reserved for staging and
//!   claimed queue entries, and this also rules out `.` and `..`)

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a component.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0', '\n', '\r'];

/// Longest component most filesystems accept.
const MAX_COMPONENT_LEN: usize = 255;

/// Validate a single path component, returning `Ok(())` if it is safe.
///
/// # Examples
///
/// ```
/// use pbx_types::names::validate_component;
///
/// assert!(validate_component("alice").is_ok());
/// assert!(validate_component("mail.v2").is_ok());
/// assert!(validate_component("").is_err());
/// assert!(validate_component("../etc").is_err());
/// ```
pub fn validate_component(value: &str) -> Result<(), TypeError> {
    let reject = |reason: &str| TypeError::InvalidComponent {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(reject("must not be empty"));
    }

    if value.len() > MAX_COMPONENT_LEN {
        return Err(reject("longer than 255 bytes"));
    }

    for ch in FORBIDDEN_CHARS {
        if value.contains(*ch) {
            return Err(TypeError::InvalidComponent {
                value: value.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    if value.starts_with('.') {
        return Err(reject("must not start with '.'"));
    }

    Ok(())
}
