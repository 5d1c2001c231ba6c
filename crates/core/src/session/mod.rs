pub mod engine;
pub mod states;

pub use engine::{QuoteSession, SessionDefaults};
pub use states::{
    AnalysisOutcome, AnalysisTicket, FinalizeOutcome, GrandTotalMismatch, QuoteReceipt,
    ResumePhase, SessionAction, SessionNotice, SessionPhase, SessionPhaseKind,
};
