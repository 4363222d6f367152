pub mod config;
pub mod errors;

pub use config::{
    AppConfig, LoggingConfig, NotifyConfig, RetentionConfig, ServerConfig, StorageConfig,
    TranslationDefaults,
};
pub use errors::{Result, SheetTranslatorError};

/// Integer or decimal with an optional sign: `42`, `-3.5`, `.5`, `7.`.
/// Exponents, `inf` and `NaN` are text.
pub fn is_numeric(value: &str) -> bool {
    let s = value.trim();
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);

    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }

    digits > 0 && dots <= 1
}
