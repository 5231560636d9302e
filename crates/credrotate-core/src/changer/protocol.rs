//! Finite-state description of the `passwd` conversation.
//!
//! Each [`ProtocolState`] lists the responses it accepts from the external
//! program, and [`transition`] maps a (state, response) pair to the reply to
//! send and the next state. The table is independent of how prompts are
//! read, so a non-interactive OS integration can drive the same machine.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RotationError};

/// Prompt and message texts printed by the password-change program.
///
/// Matching is by substring. Defaults follow Linux `passwd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswdPrompts {
    pub current_password: String,
    pub new_password: String,
    pub incorrect_current: String,
    pub retype: String,
    pub bad_password: String,
    pub updated: String,
}

impl Default for PasswdPrompts {
    fn default() -> Self {
        Self {
            current_password: "Password: ".to_string(),
            new_password: "New password: ".to_string(),
            incorrect_current: "Password incorrect: try again".to_string(),
            retype: "Retype new password: ".to_string(),
            bad_password: "BAD PASSWORD".to_string(),
            updated: "all authentication tokens updated successfully.".to_string(),
        }
    }
}

impl PasswdPrompts {
    /// Text that identifies `response` in the program output.
    pub fn pattern(&self, response: Response) -> &str {
        match response {
            Response::CurrentPasswordPrompt => &self.current_password,
            Response::NewPasswordPrompt => &self.new_password,
            Response::IncorrectCurrent => &self.incorrect_current,
            Response::RetypePrompt => &self.retype,
            Response::BadPassword => &self.bad_password,
            Response::Updated => &self.updated,
        }
    }
}

/// Something the external program can say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    CurrentPasswordPrompt,
    NewPasswordPrompt,
    IncorrectCurrent,
    RetypePrompt,
    BadPassword,
    Updated,
}

/// Where the conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    AwaitCurrentPrompt,
    AwaitNewPrompt,
    AwaitRetype,
    AwaitConfirmation,
}

impl ProtocolState {
    /// Responses accepted in this state, in matching priority order.
    pub fn expected(self) -> &'static [Response] {
        match self {
            ProtocolState::AwaitCurrentPrompt => &[Response::CurrentPasswordPrompt],
            ProtocolState::AwaitNewPrompt => {
                &[Response::NewPasswordPrompt, Response::IncorrectCurrent]
            }
            ProtocolState::AwaitRetype => &[Response::RetypePrompt, Response::BadPassword],
            ProtocolState::AwaitConfirmation => &[Response::Updated],
        }
    }
}

/// Line to send back to the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The password read from the store.
    OldPassword,
    /// A newly generated candidate.
    FreshCandidate,
    /// The candidate sent last, for confirmation.
    SameCandidate,
}

/// Outcome of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Send { reply: Reply, next: ProtocolState },
    /// The program confirmed the last candidate.
    Finish,
}

/// Transition table of the password-change conversation.
///
/// # Errors
///
/// - `RotationError::InvalidCredential` when the program rejects the
///   current password. This is never retried.
/// - `RotationError::Change` for any response the state does not accept.
pub fn transition(state: ProtocolState, response: Response) -> Result<Step> {
    use ProtocolState::*;
    use Response::*;

    match (state, response) {
        (AwaitCurrentPrompt, CurrentPasswordPrompt) => Ok(Step::Send {
            reply: Reply::OldPassword,
            next: AwaitNewPrompt,
        }),
        (AwaitNewPrompt, NewPasswordPrompt) => Ok(Step::Send {
            reply: Reply::FreshCandidate,
            next: AwaitRetype,
        }),
        (AwaitNewPrompt, IncorrectCurrent) => Err(RotationError::InvalidCredential(
            "Password retrieved from the store was rejected by the system".to_string(),
        )),
        (AwaitRetype, RetypePrompt) => Ok(Step::Send {
            reply: Reply::SameCandidate,
            next: AwaitConfirmation,
        }),
        (AwaitRetype, BadPassword) => Ok(Step::Send {
            reply: Reply::FreshCandidate,
            next: AwaitRetype,
        }),
        (AwaitConfirmation, Updated) => Ok(Step::Finish),
        (state, response) => Err(RotationError::Change(format!(
            "Unexpected response {:?} while in state {:?}",
            response, state
        ))),
    }
}
