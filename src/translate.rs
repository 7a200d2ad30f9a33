use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex_lite::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::TranslationConfig;
use crate::fetch::TRANSLATE_TIMEOUT;

/// Fallback glossary of gaming terms, applied whole-word and
/// case-insensitively when the translation endpoint is unavailable.
const GLOSSARY: &[(&str, &str)] = &[
    ("release", "релиз"),
    ("gameplay", "геймплей"),
    ("trailer", "трейлер"),
    ("update", "обновление"),
    ("patch", "патч"),
    ("expansion", "дополнение"),
    ("season", "сезон"),
    ("battle pass", "боевой пропуск"),
    ("early access", "ранний доступ"),
    ("beta", "бета-тест"),
    ("alpha", "альфа-тест"),
    ("console", "консоль"),
    ("PC", "ПК"),
    ("exclusive", "эксклюзив"),
    ("multiplayer", "мультиплеер"),
    ("singleplayer", "одиночная игра"),
    ("co-op", "кооператив"),
    ("competitive", "соревновательный"),
    ("graphics", "графика"),
    ("performance", "производительность"),
    ("frame rate", "частота кадров"),
    ("resolution", "разрешение"),
    ("announced", "анонсирована"),
    ("delayed", "отложена"),
    ("cancelled", "отменена"),
    ("studio", "студия"),
    ("developer", "разработчик"),
    ("publisher", "издатель"),
    ("review", "обзор"),
    ("score", "оценка"),
    ("metacritic", "метакритик"),
];

fn glossary_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        GLOSSARY
            .iter()
            .map(|(term, replacement)| {
                let pattern = format!(r"(?i)\b{}\b", regex_lite::escape(term));

                (Regex::new(&pattern).unwrap(), *replacement)
            })
            .collect()
    })
}

pub struct Translator {
    client: reqwest::Client,
    cfg: TranslationConfig,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl Translator {
    pub fn new(client: reqwest::Client, cfg: TranslationConfig) -> Self {
        Self { client, cfg }
    }

    /// Translates `text`, falling back to the built-in glossary on any
    /// failure. Never errors: the pipeline must always have output text.
    pub async fn translate(&self, text: &str) -> String {
        match self.remote_translate(text).await {
            Ok(translated) => translated,

            Err(e) => {
                warn!("Translation failed, using the glossary fallback: {e:#}");
                glossary_translate(text)
            }
        }
    }

    async fn remote_translate(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.cfg.url)
            .timeout(TRANSLATE_TIMEOUT)
            .json(&json!({
                "q": text,
                "source": self.cfg.source_lang,
                "target": self.cfg.target_lang,
                "format": "text",
            }))
            .send()
            .await
            .context("could not reach the translation endpoint")?
            .error_for_status()
            .context("the translation endpoint returned an error")?;

        let body: TranslateResponse = response
            .json()
            .await
            .context("malformed translation response")?;

        Ok(body.translated_text)
    }
}

/// Whole-word, case-insensitive substitution of known gaming terms.
pub fn glossary_translate(text: &str) -> String {
    let mut translated = text.to_string();

    for (regex, replacement) in glossary_patterns() {
        translated = regex.replace_all(&translated, *replacement).into_owned();
    }

    translated
}

#[cfg(test)]
mod tests {
    use super::glossary_translate;

    #[test]
    fn known_terms_are_replaced_whole_word() {
        let translated = glossary_translate("The update was released");

        assert_eq!(translated, "The обновление was released");
    }

    #[test]
    fn replacement_is_case_insensitive() {
        assert_eq!(glossary_translate("New TRAILER drops"), "New трейлер drops");
    }

    #[test]
    fn unknown_text_passes_through() {
        let text = "Nothing of note happened today.";

        assert_eq!(glossary_translate(text), text);
    }

    #[test]
    fn multi_word_terms_are_replaced() {
        assert_eq!(
            glossary_translate("the battle pass costs more"),
            "the боевой пропуск costs more"
        );
    }
}
