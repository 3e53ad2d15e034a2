//! Prompt configuration: global settings, named templates, and their resolution.

pub mod resolve;
pub mod settings;
pub mod tunable;

pub use resolve::{resolve, ResolvedPrompt, TEXT_PLACEHOLDER};
pub use settings::{find_prompt, load_prompts, preset, save_prompts, GlobalSettings, Preset, PromptConfig, PRESETS};
pub use tunable::Tunable;
