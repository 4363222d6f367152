pub mod classify;
pub mod client;

pub use classify::{classify, RowClass, RowOutcome, ERROR_MARKER};
pub use client::{TranslationClient, Translator};

#[cfg(any(test, feature = "test-export-mocks"))]
pub use client::MockTranslator;
