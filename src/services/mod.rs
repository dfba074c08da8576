pub mod answer_extractor;
pub mod page_probe;
pub mod question_classifier;
pub mod text_classifier;
pub mod text_fill;

pub use answer_extractor::AnswerExtractor;
pub use page_probe::{PageProbe, PROCESSED_MARKER, SUBMITTED_MARKER};
pub use question_classifier::{Classification, QuestionClassifier};
pub use text_classifier::{TextClass, TextClassifier};
pub use text_fill::{ConfirmState, FillOutcome, TextFillSubmitter};
