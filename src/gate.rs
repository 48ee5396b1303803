use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Locked,
    Unlocked,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Locked => "locked",
            SessionState::Unlocked => "unlocked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Unlocked,
    Rejected,
}

/// Session guard. Starts locked; one correct pin unlocks it for the rest of
/// the process. There is no way back to locked.
pub struct AccessGate {
    pin_digest: [u8; 32],
    state: SessionState,
    failed_attempts: u32,
}

fn digest(s: &str) -> [u8; 32] {
    let mut out = [0_u8; 32];
    out.copy_from_slice(&Sha256::digest(s.as_bytes()));
    out
}

impl AccessGate {
    pub fn new(pin: &str) -> Self {
        AccessGate {
            pin_digest: digest(pin),
            state: SessionState::Locked,
            failed_attempts: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == SessionState::Unlocked
    }

    pub fn login(&mut self, attempt: &str) -> LoginOutcome {
        if digest(attempt) == self.pin_digest {
            if self.state == SessionState::Locked {
                tracing::info!("session unlocked");
            }
            self.state = SessionState::Unlocked;
            LoginOutcome::Unlocked
        } else {
            self.failed_attempts += 1;
            tracing::warn!(failed_attempts = self.failed_attempts, "access pin rejected");
            LoginOutcome::Rejected
        }
    }
}
