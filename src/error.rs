// ============================================================
// Reader Errors
// ============================================================
// Every failure the reader surfaces to its caller. Nothing in
// the core retries: a collaborator failure in any step aborts
// the whole invocation and is returned as one of these.

pub type Result<T, E = ReaderError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// `run` was called before `warm_up` loaded the model.
    #[error("The reader has not been warmed up. Call warm_up() before run().")]
    NotWarmedUp,
    #[error("Failed to load the span model: {message}")]
    ModelLoad { message: String },
    /// Input-shape problems, rejected before any tokenization.
    #[error("{message}")]
    InvalidInput { message: String },
    #[error("{message}")]
    InvalidConfig { message: String },
    #[error("Tokenization failed: {message}")]
    Tokenization { message: String },
    #[error("Scoring failed: {message}")]
    Scoring { message: String },
}
