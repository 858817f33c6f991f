//! Language filtering.
//!
//! Pages are kept only when the statistical detector identifies the visible
//! text of their extracted content as the configured target language.
//! Detection runs on text, never on raw markup.

use whatlang::Lang;

use crate::parse::Document;
use crate::{Result, SitemdError};

/// ISO 639-1 codes paired with the ISO 639-3 codes the detector reports.
const ISO_639_1: &[(&str, &str)] = &[
    ("af", "afr"),
    ("ak", "aka"),
    ("am", "amh"),
    ("ar", "ara"),
    ("az", "aze"),
    ("be", "bel"),
    ("bg", "bul"),
    ("bn", "ben"),
    ("ca", "cat"),
    ("cs", "ces"),
    ("da", "dan"),
    ("de", "deu"),
    ("el", "ell"),
    ("en", "eng"),
    ("eo", "epo"),
    ("es", "spa"),
    ("et", "est"),
    ("fa", "pes"),
    ("fi", "fin"),
    ("fr", "fra"),
    ("gu", "guj"),
    ("he", "heb"),
    ("hi", "hin"),
    ("hr", "hrv"),
    ("hu", "hun"),
    ("hy", "hye"),
    ("id", "ind"),
    ("it", "ita"),
    ("ja", "jpn"),
    ("jv", "jav"),
    ("ka", "kat"),
    ("km", "khm"),
    ("kn", "kan"),
    ("ko", "kor"),
    ("la", "lat"),
    ("lt", "lit"),
    ("lv", "lav"),
    ("mk", "mkd"),
    ("ml", "mal"),
    ("mr", "mar"),
    ("my", "mya"),
    ("nb", "nob"),
    ("ne", "nep"),
    ("nl", "nld"),
    ("or", "ori"),
    ("pa", "pan"),
    ("pl", "pol"),
    ("pt", "por"),
    ("ro", "ron"),
    ("ru", "rus"),
    ("si", "sin"),
    ("sk", "slk"),
    ("sl", "slv"),
    ("sn", "sna"),
    ("sr", "srp"),
    ("sv", "swe"),
    ("ta", "tam"),
    ("te", "tel"),
    ("th", "tha"),
    ("tk", "tuk"),
    ("tl", "tgl"),
    ("tr", "tur"),
    ("uk", "ukr"),
    ("ur", "urd"),
    ("uz", "uzb"),
    ("vi", "vie"),
    ("yi", "yid"),
    ("zh", "cmn"),
    ("zu", "zul"),
];

/// Two-letter code for a detected language, falling back to the detector's
/// three-letter code when no mapping exists.
pub fn short_code(lang: Lang) -> &'static str {
    let long = lang.code();
    ISO_639_1.iter().find(|(_, l)| *l == long).map(|(s, _)| *s).unwrap_or(long)
}

/// A validated target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageTarget {
    lang: Lang,
}

impl LanguageTarget {
    /// Parses an ISO 639-1 (`en`) or 639-3 (`eng`) code.
    ///
    /// # Errors
    ///
    /// Returns [`SitemdError::Configuration`] for codes the detector cannot
    /// recognize.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim().to_ascii_lowercase();
        let long = ISO_639_1.iter().find(|(s, _)| *s == code).map(|(_, l)| *l).unwrap_or(code.as_str());
        Lang::from_code(long)
            .map(|lang| Self { lang })
            .ok_or_else(|| SitemdError::Configuration(format!("unsupported target language code: {code:?}")))
    }

    /// The detector's language value.
    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// The short code used in logs and messages.
    pub fn code(&self) -> &'static str {
        short_code(self.lang)
    }
}

impl Default for LanguageTarget {
    fn default() -> Self {
        Self { lang: Lang::Eng }
    }
}

/// Detects the language of plain text.
///
/// # Errors
///
/// Returns [`SitemdError::LanguageDetection`] for empty text or when the
/// detector has no answer. `url` only labels the error.
pub fn detect_language(text: &str, url: &str) -> Result<Lang> {
    if text.trim().is_empty() {
        return Err(SitemdError::LanguageDetection { url: url.to_string(), reason: "no text to analyze".to_string() });
    }
    whatlang::detect(text).map(|info| info.lang()).ok_or_else(|| SitemdError::LanguageDetection {
        url: url.to_string(),
        reason: "detector returned no language".to_string(),
    })
}

/// Checks an extracted HTML fragment against the target language.
///
/// Markup is stripped first so tag density cannot skew detection.
///
/// # Errors
///
/// [`SitemdError::LanguageDetection`] when detection fails and
/// [`SitemdError::LanguageMismatch`] when another language is detected.
pub fn check_language(html_fragment: &str, target: LanguageTarget, url: &str) -> Result<()> {
    let text = Document::parse_fragment(html_fragment).visible_text();
    let detected = detect_language(&text, url)?;
    if detected == target.lang() {
        Ok(())
    } else {
        Err(SitemdError::LanguageMismatch {
            url: url.to_string(),
            detected: short_code(detected).to_string(),
            target: target.code().to_string(),
        })
    }
}

/// Returns true only when `text` is detected as exactly `target`.
///
/// Detection failures and unknown target codes count as "not the target".
///
/// ```rust
/// use sitemd_core::is_target_language;
///
/// let text = "The quick brown fox jumps over the lazy dog while the farmer watches from the porch.";
/// assert!(is_target_language(text, "en"));
/// assert!(!is_target_language("", "en"));
/// ```
pub fn is_target_language(text: &str, target: &str) -> bool {
    match LanguageTarget::parse(target) {
        Ok(target) => detect_language(text, "").is_ok_and(|lang| lang == target.lang()),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLISH: &str = "This guide explains how to install the command line tools, configure your \
        project, and run the test suite before submitting a change for review.";
    const GERMAN: &str = "Diese Anleitung erklärt, wie man die Kommandozeilenwerkzeuge installiert, das \
        Projekt konfiguriert und die Testsuite ausführt, bevor man eine Änderung einreicht.";
    const FRENCH: &str = "Ce guide explique comment installer les outils en ligne de commande, configurer \
        votre projet et exécuter la suite de tests avant de soumettre une modification.";

    #[test]
    fn test_target_language_parse() {
        assert_eq!(LanguageTarget::parse("en").unwrap().lang(), Lang::Eng);
        assert_eq!(LanguageTarget::parse("EN").unwrap().lang(), Lang::Eng);
        assert_eq!(LanguageTarget::parse("eng").unwrap().lang(), Lang::Eng);
        assert_eq!(LanguageTarget::parse("de").unwrap().code(), "de");
        assert!(LanguageTarget::parse("xx").is_err());
        assert_eq!(LanguageTarget::default().code(), "en");
    }

    #[test]
    fn test_is_target_language() {
        assert!(is_target_language(ENGLISH, "en"));
        assert!(!is_target_language(GERMAN, "en"));
        assert!(is_target_language(GERMAN, "de"));
        assert!(is_target_language(FRENCH, "fr"));
    }

    #[test]
    fn test_detection_failure_is_not_target() {
        assert!(!is_target_language("", "en"));
        assert!(!is_target_language("   \n\t ", "en"));
        assert!(!is_target_language("1234 5678 !!!! ????", "en"));
        assert!(!is_target_language(ENGLISH, "not-a-code"));
    }

    #[test]
    fn test_check_language_strips_markup() {
        let html = format!(
            r#"<div class="content-wrapper-container"><p data-attribute="value">{ENGLISH}</p></div>"#
        );
        assert!(check_language(&html, LanguageTarget::default(), "u").is_ok());
    }

    #[test]
    fn test_check_language_mismatch() {
        let html = format!("<p>{GERMAN}</p>");
        let err = check_language(&html, LanguageTarget::default(), "https://example.test/de").unwrap_err();
        match err {
            SitemdError::LanguageMismatch { detected, target, .. } => {
                assert_eq!(detected, "de");
                assert_eq!(target, "en");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_language_empty_fragment() {
        let err = check_language("<div><img src='a.png'></div>", LanguageTarget::default(), "u").unwrap_err();
        assert!(matches!(err, SitemdError::LanguageDetection { .. }));
    }
}
