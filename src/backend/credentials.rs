//! Credential storage and the bounded interactive acquisition flow.
//!
//! Secrets persist in the OS credential store, keyed by backend name.
//! Acquisition is a finite state machine — prompt, validate, then
//! either ready, retry (bounded), or aborted — never an open-ended
//! recursive retry.

use keyring::Entry;
use tracing::warn;

use crate::constants::KEYRING_SERVICE;
use crate::models::BackendKind;

/// Maximum validation rounds before the flow gives up.
pub const MAX_VALIDATION_ROUNDS: u32 = 3;

/// States of the credential acquisition flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Idle,
    Prompting,
    /// A credential is being checked; `rounds_left` further rounds
    /// remain after this one.
    Validating { rounds_left: u32 },
    Ready,
    /// Validation failed; the user may re-enter a credential.
    Retrying { rounds_left: u32 },
    Aborted,
}

/// Events driving the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialEvent {
    Begin,
    /// The user entered a credential.
    Entered,
    ValidationPassed,
    ValidationFailed,
    UserCancelled,
}

/// Pure transition function for the acquisition flow.
///
/// Unknown (state, event) pairs hold the current state rather than
/// panicking.
pub fn step(state: CredentialState, event: CredentialEvent) -> CredentialState {
    use CredentialEvent::*;
    use CredentialState::*;

    match (state, event) {
        (Idle, Begin) => Prompting,
        (Prompting, Entered) => Validating {
            rounds_left: MAX_VALIDATION_ROUNDS - 1,
        },
        (Prompting, UserCancelled) => Aborted,
        (Validating { .. }, ValidationPassed) => Ready,
        (Validating { rounds_left }, ValidationFailed) => {
            if rounds_left > 0 {
                Retrying { rounds_left }
            } else {
                Aborted
            }
        }
        (Validating { .. }, UserCancelled) => Aborted,
        (Retrying { rounds_left }, Entered) => Validating {
            rounds_left: rounds_left - 1,
        },
        (Retrying { .. }, UserCancelled) => Aborted,
        (s, _) => s,
    }
}

/// Resolve the credential for a backend: the environment variable
/// takes precedence over the OS credential store.
pub fn resolve(kind: BackendKind, env: &crate::env::Env) -> Option<String> {
    if let Ok(key) = env.var(crate::constants::ENV_API_KEY) {
        if !key.trim().is_empty() {
            return Some(key);
        }
    }
    load(kind)
}

/// Load the stored credential for a backend, if any.
pub fn load(kind: BackendKind) -> Option<String> {
    match Entry::new(KEYRING_SERVICE, &kind.to_string()) {
        Ok(entry) => entry.get_password().ok(),
        Err(e) => {
            warn!("credential store unavailable: {e}");
            None
        }
    }
}

/// Persist a credential for a backend.
pub fn store(kind: BackendKind, secret: &str) -> Result<(), String> {
    let entry = Entry::new(KEYRING_SERVICE, &kind.to_string())
        .map_err(|e| format!("credential store unavailable: {e}"))?;
    entry
        .set_password(secret)
        .map_err(|e| format!("failed to store credential: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use CredentialEvent::*;
    use CredentialState::*;

    #[test]
    fn happy_path_reaches_ready() {
        let mut s = Idle;
        for event in [Begin, Entered, ValidationPassed] {
            s = step(s, event);
        }
        assert_eq!(s, Ready);
    }

    #[test]
    fn cancel_while_prompting_aborts() {
        let s = step(step(Idle, Begin), UserCancelled);
        assert_eq!(s, Aborted);
    }

    #[test]
    fn failed_validation_enters_retrying() {
        let s = step(step(step(Idle, Begin), Entered), ValidationFailed);
        assert_eq!(
            s,
            Retrying {
                rounds_left: MAX_VALIDATION_ROUNDS - 1
            }
        );
    }

    #[test]
    fn validation_rounds_are_bounded() {
        // Keep entering bad credentials; count validations until Aborted.
        let mut s = step(Idle, Begin);
        let mut validations = 0;
        loop {
            match s {
                Prompting | Retrying { .. } => s = step(s, Entered),
                Validating { .. } => {
                    validations += 1;
                    assert!(validations <= MAX_VALIDATION_ROUNDS, "unbounded retry loop");
                    s = step(s, ValidationFailed);
                }
                Aborted => break,
                other => panic!("unexpected state {other:?}"),
            }
        }
        assert_eq!(validations, MAX_VALIDATION_ROUNDS);
    }

    #[test]
    fn retry_then_success_reaches_ready() {
        let mut s = Idle;
        s = step(s, Begin);
        s = step(s, Entered);
        s = step(s, ValidationFailed);
        s = step(s, Entered);
        s = step(s, ValidationPassed);
        assert_eq!(s, Ready);
    }

    #[test]
    fn cancel_while_retrying_aborts() {
        let mut s = Idle;
        s = step(s, Begin);
        s = step(s, Entered);
        s = step(s, ValidationFailed);
        s = step(s, UserCancelled);
        assert_eq!(s, Aborted);
    }

    #[test]
    fn env_credential_takes_precedence_over_store() {
        let env = crate::env::Env::mock([("REDLINE_API_KEY", "sk-from-env")]);
        assert_eq!(
            resolve(BackendKind::OpenAi, &env),
            Some("sk-from-env".to_string())
        );
    }

    #[test]
    fn unknown_transitions_hold_state() {
        assert_eq!(step(Idle, ValidationPassed), Idle);
        assert_eq!(step(Ready, Entered), Ready);
        assert_eq!(step(Aborted, Begin), Aborted);
    }
}
