//! Strict mode PIN protection.
//!
//! Strict mode disables temporary unblocks. Turning it off again requires the
//! PIN chosen when it was enabled. PINs are stored as Argon2 PHC strings.
//!
//! ## Usage
//!
//! ```
//! use focustube_core::settings::Settings;
//! use focustube_core::strict;
//!
//! let mut settings = Settings::default();
//! strict::enable_strict_mode(&mut settings, "2468").unwrap();
//! assert!(settings.strict_mode);
//!
//! strict::disable_strict_mode(&mut settings, "2468").unwrap();
//! assert!(!settings.strict_mode);
//! ```

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::info;

use crate::error::{CoreError, Result};
use crate::settings::Settings;

/// Minimum PIN length.
pub const MIN_PIN_LENGTH: usize = 4;

/// Checks that a PIN is acceptable.
pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.is_empty() {
        return Err(CoreError::PinEmpty);
    }
    if pin.chars().count() < MIN_PIN_LENGTH {
        return Err(CoreError::PinTooShort);
    }
    Ok(())
}

/// Hashes a PIN with Argon2 and a fresh salt.
pub fn hash_pin(pin: &str) -> Result<String> {
    validate_pin(pin)?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| CoreError::HashingFailed(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a PIN against a stored hash.
pub fn verify_pin(pin: &str, hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| CoreError::VerificationFailed(e.to_string()))?;

    match Argon2::default().verify_password(pin.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CoreError::VerificationFailed(e.to_string())),
    }
}

/// Fails unless `pin` matches the stored PIN.
fn require_pin(settings: &Settings, pin: &str) -> Result<()> {
    let hash = settings.pin_hash.as_deref().ok_or(CoreError::PinNotSet)?;
    if verify_pin(pin, hash)? {
        Ok(())
    } else {
        Err(CoreError::PinMismatch)
    }
}

/// Turns strict mode on, storing `pin` for later.
///
/// Any active temporary unblock stops applying immediately.
pub fn enable_strict_mode(settings: &mut Settings, pin: &str) -> Result<()> {
    settings.pin_hash = Some(hash_pin(pin)?);
    settings.strict_mode = true;
    info!("Strict mode enabled");
    Ok(())
}

/// Turns strict mode off after checking `pin`.
pub fn disable_strict_mode(settings: &mut Settings, pin: &str) -> Result<()> {
    require_pin(settings, pin)?;
    settings.strict_mode = false;
    info!("Strict mode disabled");
    Ok(())
}

/// Replaces the stored PIN after checking the current one.
pub fn change_pin(settings: &mut Settings, current: &str, new_pin: &str) -> Result<()> {
    require_pin(settings, current)?;
    settings.pin_hash = Some(hash_pin(new_pin)?);
    info!("Strict mode PIN changed");
    Ok(())
}
