pub mod document;
pub mod json_recover;
pub mod merger;
pub mod normalizer;
pub mod prompts;

pub use json_recover::{normalize_model_text, parse_relaxed, recover_json, JsonShape};
pub use merger::merge_questions_and_keys;
pub use normalizer::{normalize_answer_key, normalize_question};
