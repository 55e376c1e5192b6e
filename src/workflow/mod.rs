pub mod quiz_flow;
pub mod retry;
pub mod session;

pub use quiz_flow::QuizFlow;
pub use retry::RetryController;
pub use session::{
    Advance, Applied, FeedbackOutcome, GenerationOutcome, QuizSession, ReviewItem, SessionPhase,
    SessionState, TransitionError,
};
