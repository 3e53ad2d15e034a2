//! Local history of analysis records.
//!
//! - [`store`] — the [`HistoryStore`]: add, list, search, delete, clear, migrate
//! - [`types`] — [`HistoryRecord`], [`NewRecord`], [`ContextType`]
//! - [`image`] — the persisted table image
//! - [`export`] — Markdown rendering and viewer payloads
//! - [`fallback`] — session-only list used when persisting fails

pub mod export;
pub mod fallback;
pub mod image;
pub mod store;
pub mod time;
pub mod types;

pub use export::ViewerPayload;
pub use fallback::SessionFallback;
pub use store::HistoryStore;
pub use types::{ContextType, HistoryRecord, NewRecord};
