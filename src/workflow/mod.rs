pub mod choice_trial;
pub mod question_ctx;
pub mod scheduler;

pub use choice_trial::{
    ChoiceTrialEngine, ExhaustReason, TrialOutcome, TrialPhase, TrialRun, TrialState, TrialStep,
};
pub use question_ctx::QuestionCtx;
pub use scheduler::{Clock, Scheduler, TokioClock, VirtualClock};
