pub mod answer;
pub mod ledger;
pub mod question;

pub use answer::{AnswerCandidate, CandidateKind};
pub use ledger::{LedgerPhase, ProcessedLedger};
pub use question::{ChoiceOption, ContainerKey, QuestionContainer, QuestionKind};
