//! Post-win advice text
//!
//! The text itself comes from an external service. This module only defines
//! the seam and the canned fallback used whenever that service can't answer.

use crate::error::AdviceError;

/// Shown when no advice service is configured
pub const NO_SERVICE_TEXT: &str = "Nicely done! Keep it up!";

/// Shown when the advice service fails
pub const FALLBACK_TEXT: &str = "Great job! Try going faster next time.";

/// Something that can produce a short comment for a finished level
pub trait AdviceSource {
    fn fetch(&mut self, coins_collected: u32) -> Result<String, AdviceError>;
}

/// Ask `source` for advice, never failing
pub fn advice_or_fallback(source: Option<&mut dyn AdviceSource>, coins_collected: u32) -> String {
    let Some(source) = source else {
        return NO_SERVICE_TEXT.to_string();
    };
    match source.fetch(coins_collected) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => FALLBACK_TEXT.to_string(),
        Err(AdviceError::Unavailable) => NO_SERVICE_TEXT.to_string(),
        Err(e) => {
            log::warn!("Advice fetch failed: {}", e);
            FALLBACK_TEXT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<String, String>);

    impl AdviceSource for Fixed {
        fn fetch(&mut self, _coins_collected: u32) -> Result<String, AdviceError> {
            self.0.clone().map_err(AdviceError::Request)
        }
    }

    #[test]
    fn test_missing_source_uses_canned_text() {
        assert_eq!(advice_or_fallback(None, 3), NO_SERVICE_TEXT);
    }

    #[test]
    fn test_failure_uses_fallback() {
        let mut source = Fixed(Err("timeout".to_string()));
        assert_eq!(advice_or_fallback(Some(&mut source), 3), FALLBACK_TEXT);
    }

    #[test]
    fn test_success_is_trimmed() {
        let mut source = Fixed(Ok("  Smooth moves!\n".to_string()));
        assert_eq!(advice_or_fallback(Some(&mut source), 3), "Smooth moves!");
        let mut blank = Fixed(Ok("   ".to_string()));
        assert_eq!(advice_or_fallback(Some(&mut blank), 3), FALLBACK_TEXT);
    }
}
