pub mod batch;
pub mod question;
pub mod session;

pub use batch::{BatchOutcome, BatchStats, ExtractionFailure, RawQuestionBlock};
pub use question::{
    AnswerKeyEntry, Difficulty, ExtractedQuestion, MergedQuestion, QuestionOption, QuestionSource,
    Solution,
};
pub use session::SessionStore;
