//! Student credential generation.
//!
//! Usernames are a friendly word plus two digits (`otter42`); passwords are
//! short codes drawn from an alphabet without look-alike characters so they
//! can be read off a printed slip.

use rand::Rng;

use crate::error::CoreError;

/// Maximum number of students created by a single request.
pub const MAX_CREDENTIAL_BATCH: usize = 50;

/// Attempts per student before giving up on finding a free username.
pub const MAX_USERNAME_ATTEMPTS: usize = 10;

pub const PASSWORD_LENGTH: usize = 6;

/// No `0/O`, `1/l/I`.
const PASSWORD_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";

const USERNAME_WORDS: &[&str] = &[
    "otter", "falcon", "maple", "comet", "pebble", "tiger", "willow", "ember", "harbor", "lynx",
    "cedar", "nova", "orca", "quartz", "raven", "sparrow", "tulip", "violet", "walrus", "zephyr",
    "badger", "coral", "dune", "fjord", "gecko", "heron", "iris", "juniper", "koala", "lotus",
];

/// Validate the requested batch size.
pub fn validate_credential_count(count: usize) -> Result<(), CoreError> {
    if count == 0 || count > MAX_CREDENTIAL_BATCH {
        return Err(CoreError::Validation(format!(
            "Credential count must be between 1 and {MAX_CREDENTIAL_BATCH}"
        )));
    }
    Ok(())
}

/// Generate a candidate username such as `heron07`.
pub fn generate_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    let word = USERNAME_WORDS[rng.random_range(0..USERNAME_WORDS.len())];
    let number: u8 = rng.random_range(0..100);
    format!("{word}{number:02}")
}

/// Generate a [`PASSWORD_LENGTH`]-character password.
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.random_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}
