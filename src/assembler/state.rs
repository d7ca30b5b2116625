use std::mem;

use bytes::Bytes;

use crate::{
    error::{MultipartError, ProtocolError, UsageError},
    frame::{Frame, HeaderFields},
};

/// Coordination state shared by the part consumer and the body consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AssemblerState {
    /// Nothing requested yet.
    Initial,
    /// Between parts. Holds the next header block when the body consumer
    /// already pulled it off the source.
    WaitingToSendHeaders(Option<HeaderFields>),
    /// The current part's body owns the source.
    StreamingBody,
    /// The body consumer saw the source fail and the part consumer has not
    /// been told yet.
    Failed,
    /// Source exhausted, or its failure already reported to both consumers.
    Finished,
}

/// Reasons the assembler stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AssemblyFault {
    Usage(UsageError),
    Protocol(ProtocolError),
}

impl From<AssemblyFault> for MultipartError {
    fn from(fault: AssemblyFault) -> Self {
        match fault {
            AssemblyFault::Usage(err) => err.into(),
            AssemblyFault::Protocol(err) => err.into(),
        }
    }
}

/// What the part consumer should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PartAction {
    FetchFrame,
    EmitPart(HeaderFields),
    ReturnNone,
    ReportFailure,
    Fail(AssemblyFault),
}

/// What the body consumer should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BodyAction {
    FetchFrame,
    EmitChunk(Bytes),
    ReturnNone,
    Fail(AssemblyFault),
}

/// Pure transition function behind the coordinator.
///
/// Parts are numbered from 1 as they are emitted; a body consumer passes its
/// part number so that a stale body never pulls frames for a later part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Assembler {
    state: AssemblerState,
    current_part: u64,
}

impl Default for Assembler {
    fn default() -> Self {
        Self {
            state: AssemblerState::Initial,
            current_part: 0,
        }
    }
}

impl Assembler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &AssemblerState {
        &self.state
    }

    /// Number of the most recently emitted part.
    pub(crate) fn current_part(&self) -> u64 {
        self.current_part
    }

    pub(crate) fn next_part(&mut self) -> PartAction {
        match mem::replace(&mut self.state, AssemblerState::Finished) {
            AssemblerState::Initial | AssemblerState::WaitingToSendHeaders(None) => {
                self.state = AssemblerState::WaitingToSendHeaders(None);
                PartAction::FetchFrame
            }
            AssemblerState::WaitingToSendHeaders(Some(fields)) => self.emit_part(fields),
            AssemblerState::StreamingBody => {
                PartAction::Fail(AssemblyFault::Usage(UsageError::NextPartBeforeBodyConsumed))
            }
            AssemblerState::Failed => PartAction::ReportFailure,
            AssemblerState::Finished => PartAction::ReturnNone,
        }
    }

    pub(crate) fn part_received(&mut self, frame: Option<Frame>) -> PartAction {
        match (mem::replace(&mut self.state, AssemblerState::Finished), frame) {
            (AssemblerState::WaitingToSendHeaders(None), None) => PartAction::ReturnNone,
            (AssemblerState::WaitingToSendHeaders(None), Some(Frame::HeaderFields(fields))) => {
                self.emit_part(fields)
            }
            (AssemblerState::WaitingToSendHeaders(None), Some(Frame::BodyChunk(_))) => {
                PartAction::Fail(AssemblyFault::Protocol(ProtocolError::BodyChunkBeforeHeaders))
            }
            (AssemblerState::WaitingToSendHeaders(Some(_)), _) => {
                PartAction::Fail(AssemblyFault::Protocol(ProtocolError::FrameWhileHeadersBuffered))
            }
            (AssemblerState::Finished, _) => PartAction::ReturnNone,
            (
                AssemblerState::Initial | AssemblerState::StreamingBody | AssemblerState::Failed,
                _,
            ) => PartAction::Fail(AssemblyFault::Protocol(ProtocolError::UnexpectedFrame)),
        }
    }

    pub(crate) fn next_body_chunk(&self, part: u64) -> BodyAction {
        if part != self.current_part {
            return BodyAction::ReturnNone;
        }

        match self.state {
            AssemblerState::StreamingBody => BodyAction::FetchFrame,
            AssemblerState::Initial
            | AssemblerState::WaitingToSendHeaders(_)
            | AssemblerState::Failed
            | AssemblerState::Finished => BodyAction::ReturnNone,
        }
    }

    pub(crate) fn body_received(&mut self, frame: Option<Frame>) -> BodyAction {
        match (mem::replace(&mut self.state, AssemblerState::Finished), frame) {
            (AssemblerState::StreamingBody, None) => BodyAction::ReturnNone,
            (AssemblerState::StreamingBody, Some(Frame::HeaderFields(fields))) => {
                self.state = AssemblerState::WaitingToSendHeaders(Some(fields));
                BodyAction::ReturnNone
            }
            (AssemblerState::StreamingBody, Some(Frame::BodyChunk(chunk))) => {
                self.state = AssemblerState::StreamingBody;
                BodyAction::EmitChunk(chunk)
            }
            (AssemblerState::WaitingToSendHeaders(Some(_)), _) => {
                self.body_fault(ProtocolError::FrameWhileHeadersBuffered)
            }
            (AssemblerState::Finished, _) => BodyAction::ReturnNone,
            (
                AssemblerState::Initial
                | AssemblerState::WaitingToSendHeaders(None)
                | AssemblerState::Failed,
                _,
            ) => self.body_fault(ProtocolError::UnexpectedFrame),
        }
    }

    /// The source failed while the part consumer was waiting on it. The
    /// error goes straight to that consumer, so nothing is left to report.
    pub(crate) fn part_source_failed(&mut self) {
        self.state = AssemblerState::Finished;
    }

    /// The source failed while a body was streaming. The next part request
    /// reports the failure instead of a clean end.
    pub(crate) fn body_source_failed(&mut self) {
        self.state = AssemblerState::Failed;
    }

    fn body_fault(&mut self, err: ProtocolError) -> BodyAction {
        self.state = AssemblerState::Failed;
        BodyAction::Fail(AssemblyFault::Protocol(err))
    }

    fn emit_part(&mut self, fields: HeaderFields) -> PartAction {
        self.state = AssemblerState::StreamingBody;
        self.current_part += 1;
        PartAction::EmitPart(fields)
    }
}
