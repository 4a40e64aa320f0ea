//! Approval oracle collaborator
//!
//! The oracle decides whether this node is willing to contribute the
//! requested resources to the proposed artifact. In production it fronts a
//! human, so a call may block for a long time; the engine never holds its
//! state lock across the call.

use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;

/// Oracle failure
#[derive(Debug, Error)]
#[error("Approval oracle failed: {0}")]
pub struct OracleError(pub String);

/// External approval decision for a proposal
pub trait ApprovalOracle: Send + Sync {
    /// May block pending a human decision. An `Err` is treated by the engine
    /// as a denial, never as an approval.
    fn approve(&self, artifact: &[u8], resources: &[String]) -> Result<bool, OracleError>;
}

/// Oracle that approves everything (demos, happy-path tests)
pub struct AutoApprove;

impl ApprovalOracle for AutoApprove {
    fn approve(&self, _artifact: &[u8], _resources: &[String]) -> Result<bool, OracleError> {
        Ok(true)
    }
}

/// Oracle that replays a scripted sequence of answers, then denies
pub struct ScriptedOracle {
    answers: Mutex<VecDeque<Result<bool, String>>>,
}

impl ScriptedOracle {
    pub fn new(answers: impl IntoIterator<Item = Result<bool, String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
        }
    }

    /// Shorthand for a script of plain yes/no answers
    pub fn answering(answers: impl IntoIterator<Item = bool>) -> Self {
        Self::new(answers.into_iter().map(Ok))
    }
}

impl ApprovalOracle for ScriptedOracle {
    fn approve(&self, _artifact: &[u8], _resources: &[String]) -> Result<bool, OracleError> {
        match self.answers.lock().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(e)) => Err(OracleError(e)),
            None => Ok(false),
        }
    }
}
