//! Operating-system password change.
//!
//! [`InteractiveChanger`] drives the conversation described in
//! [`protocol`] over a [`PromptSession`], pulling candidates from a
//! [`CandidateSource`] until the system accepts one.

pub mod protocol;
mod session;

pub use protocol::{PasswdPrompts, ProtocolState, Reply, Response, Step};
#[cfg(unix)]
pub use session::{PtySession, PtySpawner};
pub use session::{PromptSession, SessionSpawner};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::{Result, RotationError};
use crate::password::CandidateSource;

/// Changes the account password from a known old value to a new one.
pub trait CredentialChanger {
    /// Replace `old_password` and return the password the system confirmed.
    ///
    /// Nothing persistent outside the OS account is touched here; on error
    /// the caller must assume the old password is still in effect.
    fn change(&mut self, old_password: &SecretString) -> Result<SecretString>;
}

/// Password changer speaking the `passwd` prompt protocol.
pub struct InteractiveChanger<S, G> {
    spawner: S,
    candidates: G,
    prompts: PasswdPrompts,
}

impl<S, G> InteractiveChanger<S, G>
where
    S: SessionSpawner,
    G: CandidateSource,
{
    pub fn new(spawner: S, candidates: G, prompts: PasswdPrompts) -> Self {
        Self {
            spawner,
            candidates,
            prompts,
        }
    }
}

impl<S, G> CredentialChanger for InteractiveChanger<S, G>
where
    S: SessionSpawner,
    G: CandidateSource,
{
    fn change(&mut self, old_password: &SecretString) -> Result<SecretString> {
        let mut session = self.spawner.spawn()?;
        let mut state = ProtocolState::AwaitCurrentPrompt;
        let result = self.converse(session.as_mut(), old_password, &mut state);

        // Once the retyped candidate is out, the program may have applied it
        // even though it never printed the confirmation.
        result.map_err(|err| match err {
            RotationError::Change(message) if state == ProtocolState::AwaitConfirmation => {
                RotationError::UnconfirmedChange(message)
            }
            other => other,
        })
    }
}

impl<S, G> InteractiveChanger<S, G>
where
    S: SessionSpawner,
    G: CandidateSource,
{
    fn converse(
        &mut self,
        session: &mut dyn PromptSession,
        old_password: &SecretString,
        state: &mut ProtocolState,
    ) -> Result<SecretString> {
        let mut candidate: Option<SecretString> = None;
        let mut rejected = 0usize;

        loop {
            let expected = state.expected();
            let patterns: Vec<&str> = expected
                .iter()
                .map(|response| self.prompts.pattern(*response))
                .collect();
            let index = session.expect_any(&patterns)?;
            let response = expected.get(index).copied().ok_or_else(|| {
                RotationError::Change(format!("Session matched unknown pattern index {}", index))
            })?;
            debug!(state = ?*state, ?response, "password change prompt");

            match protocol::transition(*state, response)? {
                Step::Send { reply, next } => {
                    match reply {
                        Reply::OldPassword => session.send_line(old_password.expose_secret())?,
                        Reply::FreshCandidate => {
                            if response == Response::BadPassword {
                                rejected += 1;
                                warn!(rejected, "candidate rejected by password policy");
                            }
                            let fresh = self.candidates.next_candidate()?;
                            session.send_line(fresh.expose_secret())?;
                            candidate = Some(fresh);
                        }
                        Reply::SameCandidate => {
                            let current = candidate.as_ref().ok_or_else(|| {
                                RotationError::Change(
                                    "Confirmation requested before any candidate was sent"
                                        .to_string(),
                                )
                            })?;
                            session.send_line(current.expose_secret())?;
                        }
                    }
                    *state = next;
                }
                Step::Finish => {
                    info!(rejected, "system confirmed the new password");
                    return candidate.ok_or_else(|| {
                        RotationError::Change(
                            "Program reported success before a candidate was sent".to_string(),
                        )
                    });
                }
            }
        }
    }
}
