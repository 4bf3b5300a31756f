//! Verification codes handed to voters after a successful ballot

use rand::rngs::OsRng;
use rand::RngCore;

use crate::schema::{VerificationCode, VERIFICATION_CODE_BYTES};

/// Draws a new code from the OS CSPRNG.
pub fn generate_code() -> VerificationCode {
    let mut bytes = [0u8; VERIFICATION_CODE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    VerificationCode::from_bytes(&bytes)
}

/// Where the ledger takes verification codes from.
pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> VerificationCode;
}

/// Codes from the OS CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsCodeSource;

impl CodeSource for OsCodeSource {
    fn next_code(&self) -> VerificationCode {
        generate_code()
    }
}
