//! Specflow workflow orchestrator
//!
//! The [`Engine`] composes the three subsystems: it loads configuration,
//! resolves the active protocol (explicit override parameter, never
//! ambient process state), loads workflow state, and exposes the
//! operations command layers call: compile a stage's inputs, record an
//! approval or completion, check workspace health, validate completion.
//!
//! Template rendering and prompt-quality linting are external
//! collaborators behind the [`PromptRenderer`] and [`PromptLinter`]
//! traits; the engine only guarantees the input set it hands over is
//! dependency-complete and path-safe.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod assets;
mod check;
mod compile;
mod engine;
mod error;

pub use assets::{init_workspace, DEFAULT_PROTOCOL_YAML};
pub use check::{CompletionStatus, HealthReport};
pub use compile::{
    CompileOptions, CompiledPrompt, InputFile, PromptLinter, PromptRenderer, RenderError,
    TemplateData,
};
pub use engine::Engine;
pub use error::EngineError;
