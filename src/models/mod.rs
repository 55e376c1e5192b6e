//! 数据模型
//!
//! 纯数据类型，不做任何 I/O

pub mod answer;
pub mod payload;
pub mod question;
pub mod score;
pub mod topic;
pub mod user;

pub use answer::AnswerRecord;
pub use payload::{
    ChatMessage, FeedbackRequest, FeedbackResponse, GenerationRequest, GenerationResponse,
    LoginRequest, LoginResponse, RegisterRequest, ServiceErrorBody, TutorRequest, TutorResponse,
};
pub use question::{Question, QuestionSetError, RawQuestion};
pub use score::{PerformanceBand, ScoreResult};
pub use topic::{Difficulty, QuizAttempt, Topic};
pub use user::UserIdentity;
