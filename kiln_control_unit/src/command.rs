//! Command intake plumbing.
//!
//! External surfaces submit [`Command`]s through a bounded queue; the
//! supervisor drains a handful per tick and answers each on a per-command
//! reply channel. Nothing here blocks the control loop: the supervisor
//! side uses `try_recv`/`try_send` exclusively.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};

use kiln_common::command::{Command, CommandRejection};

/// Verdict returned to the submitter.
pub type CommandOutcome = Result<(), CommandRejection>;

/// One queued command with its optional reply path.
#[derive(Debug)]
pub struct CommandEnvelope {
    pub command: Command,
    pub reply: Option<SyncSender<CommandOutcome>>,
}

/// Submission failure, as opposed to a command rejection.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The supervisor rejected the command.
    #[error(transparent)]
    Rejected(#[from] CommandRejection),

    /// The inbound queue is full.
    #[error("command queue is full")]
    QueueFull,

    /// The supervisor is gone.
    #[error("controller disconnected")]
    Disconnected,
}

/// Build the bounded inbound queue.
pub fn command_channel(depth: usize) -> (CommandClient, Receiver<CommandEnvelope>) {
    let (tx, rx) = sync_channel(depth);
    (CommandClient { tx }, rx)
}

/// Submitter handle. Cloneable; each external surface gets one.
#[derive(Debug, Clone)]
pub struct CommandClient {
    tx: SyncSender<CommandEnvelope>,
}

impl CommandClient {
    /// Submit a command and wait for the supervisor's verdict (at most
    /// one tick away).
    pub fn submit(&self, command: Command) -> Result<(), SubmitError> {
        let (reply_tx, reply_rx) = sync_channel(1);
        let envelope = CommandEnvelope {
            command,
            reply: Some(reply_tx),
        };
        match self.tx.try_send(envelope) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(SubmitError::QueueFull),
            Err(TrySendError::Disconnected(_)) => return Err(SubmitError::Disconnected),
        }
        match reply_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(rejection)) => Err(SubmitError::Rejected(rejection)),
            Err(_) => Err(SubmitError::Disconnected),
        }
    }

    /// Fire-and-forget submission.
    pub fn post(&self, command: Command) -> Result<(), SubmitError> {
        let envelope = CommandEnvelope {
            command,
            reply: None,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SubmitError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::Disconnected),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
