pub mod enhance;
pub mod pipeline;
pub mod prompts;
pub mod query;

pub use pipeline::{
    run_chat_pipeline, ChatDiagnostics, ChatOutcome, ChatPipelineConfig, ChatPipelineDeps,
};
