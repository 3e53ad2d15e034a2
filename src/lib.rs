//! Explain selected text, images, or whole web pages with an LLM, and keep a
//! searchable local history of the answers.
//!
//! # Architecture
//!
//! - **Storage**: a two-scope key/value [`blob::BlobStore`] (a small `sync` area
//!   for settings, a larger `local` area for history). The history itself is an
//!   in-memory SQLite table persisted as one JSON image after every change.
//! - **Extraction**: HTML pages are parsed with `scraper` and walked into bounded,
//!   noise-free Markdown.
//! - **Requests**: prompts resolve against global settings into an
//!   OpenAI-compatible chat-completion request, sent through a
//!   [`llm::CompletionBackend`].
//!
//! # Modules
//!
//! - [`blob`] — key/value persistence with quotas, in-memory and file-backed
//! - [`config`] — configuration loading from TOML files and environment variables
//! - [`db`] — SQLite schema and connection setup for the history table
//! - [`history`] — the history store, record types, export, and session fallback
//! - [`extract`] — HTML to Markdown content extraction
//! - [`prompt`] — global settings, saved prompts, and prompt resolution
//! - [`llm`] — chat-completion wire types and the HTTP backend
//! - [`explainer`] — the explain flow tying the above together

pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod explainer;
pub mod extract;
pub mod history;
pub mod llm;
pub mod prompt;

pub use error::{ExplainerError, Result};
