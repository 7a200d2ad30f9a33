use serde::Deserialize;

/// Which renderer the composer writes through, and the matching Telegram
/// parse mode.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageFormat {
    #[default]
    Html,
    Plain,
}

impl MessageFormat {
    pub fn markup(&self) -> Box<dyn Markup> {
        match self {
            Self::Html => Box::new(TelegramHtml),
            Self::Plain => Box::new(PlainText),
        }
    }

    pub fn parse_mode(&self) -> Option<&'static str> {
        match self {
            Self::Html => Some("HTML"),
            Self::Plain => None,
        }
    }
}

/// Output-format seam between content generation and the delivery channel.
/// The composer never emits markup directly; it goes through this trait, so
/// a channel without rich text gets plain strings instead of stray tags.
pub trait Markup {
    fn bold(&self, text: &str) -> String;

    fn italic(&self, text: &str) -> String;

    fn header(&self, text: &str, emoji: &str) -> String {
        format!("{emoji} {}", self.bold(&text.to_uppercase()))
    }

    fn highlight(&self, text: &str) -> String {
        format!("✨ {text} ✨")
    }
}

/// Telegram's HTML parse mode.
pub struct TelegramHtml;

impl Markup for TelegramHtml {
    fn bold(&self, text: &str) -> String {
        format!("<b>{text}</b>")
    }

    fn italic(&self, text: &str) -> String {
        format!("<i>{text}</i>")
    }
}

pub struct PlainText;

impl Markup for PlainText {
    fn bold(&self, text: &str) -> String {
        text.to_string()
    }

    fn italic(&self, text: &str) -> String {
        text.to_string()
    }
}
