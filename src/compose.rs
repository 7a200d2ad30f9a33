pub mod style;

use std::sync::OnceLock;

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};
use regex::Regex;
use serde::Serialize;

use crate::entity::Entity;
use crate::template::{self, Template};

use self::style::Markup;

/// Selection seam: every random choice the composer makes goes through this,
/// so tests can substitute a deterministic picker.
pub trait Pick {
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>;
}

pub struct UniformPick(SmallRng);

impl UniformPick {
    pub fn new() -> Self {
        Self(SmallRng::from_rng(thread_rng()).unwrap())
    }
}

impl Default for UniformPick {
    fn default() -> Self {
        Self::new()
    }
}

impl Pick for UniformPick {
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.0)
    }
}

/// Title candidate pools. `{entity}` is replaced with the entity name.
const BREAKING_TITLES: &[&str] = &[
    "{entity}: СРОЧНЫЕ НОВОСТИ",
    "ЭКСКЛЮЗИВ: {entity} раскрывает детали",
    "{entity} - ГЛАВНАЯ ИГРОВАЯ НОВОСТЬ ДНЯ",
];

const ANNOUNCEMENT_TITLES: &[&str] = &[
    "{entity} анонсирует новый проект",
    "ОФИЦИАЛЬНО: {entity} представляет",
    "{entity} готовит сюрприз для фанатов",
];

const REVIEW_TITLES: &[&str] = &[
    "{entity}: первые впечатления и обзоры",
    "ОЦЕНКИ: {entity} получает рейтинги",
    "{entity} в рецензиях критиков",
];

const UPDATE_TITLES: &[&str] = &[
    "{entity} выпускает масштабное обновление",
    "ПАТЧ: {entity} меняет геймплей",
    "{entity} - новые возможности в обновлении",
];

const TRAILER_TITLES: &[&str] = &[
    "ПОТРЯСАЮЩИЙ ТРЕЙЛЕР {entity}",
    "{entity}: эксклюзивный геймплей",
    "ВИЗУАЛЬНАЯ ФАНТАСТИКА: {entity}",
];

const RELEASE_TITLES: &[&str] = &[
    "{entity} ВЫХОДИТ НА ВСЕХ ПЛАТФОРМАХ",
    "ДОЛГОЖДАННЫЙ РЕЛИЗ: {entity}",
    "{entity} - дата выхода назначена",
];

/// Insight theme buckets, checked in order; the first bucket whose keyword
/// occurs in the source text wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Release,
    Update,
    Trailer,
    Dlc,
    General,
}

const THEME_KEYWORDS: &[(Theme, &[&str])] = &[
    (Theme::Release, &["релиз", "release", "выход"]),
    (Theme::Update, &["обновление", "update", "патч", "patch"]),
    (Theme::Trailer, &["трейлер", "trailer", "геймплей", "gameplay"]),
    (Theme::Dlc, &["dlc", "дополнение", "expansion"]),
];

/// Insight templates as (emoji, bolded label, remainder) triples.
const RELEASE_INSIGHTS: &[(&str, &str, &str)] = &[
    ("🎉", "ВАЖНЫЙ РЕЛИЗ", ": Готовьтесь к выходу долгожданного проекта!"),
    ("🚀", "ЗАПУСК", ": Игра выходит на все платформы с впечатляющим контентом."),
    ("📅", "ДАТА ВЫХОДА", ": Отметим в календаре - скоро начнется новая эра!"),
];

const UPDATE_INSIGHTS: &[(&str, &str, &str)] = &[
    ("🛠️", "ОБНОВЛЕНИЕ", ": Разработчики улучшают игровой опыт."),
    ("⚙️", "БАЛАНС", ": Патч приносит значительные изменения в геймплей."),
    ("🔧", "ФИКСЫ", ": Исправлены критические ошибки и добавлен новый контент."),
];

const TRAILER_INSIGHTS: &[(&str, &str, &str)] = &[
    ("🎬", "ЗРЕЛИЩНЫЙ ТРЕЙЛЕР", ": Видео демонстрирует потрясающую графику."),
    ("📹", "ГОРЯЧИЙ ГЕЙМПЛЕЙ", ": Новые кадры раскрывают механику игры."),
    ("👀", "ПЕРВЫЙ ВЗГЛЯД", ": Эксклюзивные материалы уже доступны."),
];

const DLC_INSIGHTS: &[(&str, &str, &str)] = &[
    ("🆕", "НОВЫЙ КОНТЕНТ", ": Дополнение расширяет вселенную игры."),
    ("🌟", "ДОПОЛНИТЕЛЬНАЯ ИСТОРИЯ", ": Игроки получат новые приключения."),
    ("💎", "ЭКСПАНШЕН", ": Масштабное обновление с уникальным сюжетом."),
];

const GENERAL_INSIGHTS: &[(&str, &str, &str)] = &[
    ("🎯", "ИГРОВАЯ СЕНСАЦИЯ", ": Проект обещает стать хитом сезона."),
    ("🚀", "ТЕХНОЛОГИЧЕСКИЙ ПРОРЫВ", ": Инновации в игровом дизайне."),
    ("💫", "ТВОРЧЕСКИЙ ПОДХОД", ": Разработчики создают нечто уникальное."),
    ("🔥", "ОЖИДАЕМЫЙ ПРОЕКТ", ": Сообщество с нетерпением ждет новинку."),
];

const RELEASE_FACTS: &[&str] = &[
    "Ожидается высокий спрос среди игроков всех платформ.",
    "Предзаказы уже бьют рекорды в цифровых магазинах.",
    "Критики предрекают игре успех у аудитории.",
];

const UPDATE_FACTS: &[&str] = &[
    "Изменения затронут баланс и мета-игру.",
    "Сообщество активно обсуждает новые фичи.",
    "Обновление также улучшит оптимизацию.",
];

const TRAILER_FACTS: &[&str] = &[
    "Видео набрало миллионы просмотров за первые часы.",
    "Фанаты анализируют каждый кадр в поисках пасхалок.",
    "Трейлер получил положительные отзывы за визуал.",
];

const DLC_FACTS: &[&str] = &[
    "Дополнение добавит десятки часов игрового времени.",
    "Разработчики учли пожелания сообщества.",
    "Новый контент раскроет неизвестные детали сюжета.",
];

const GENERAL_FACTS: &[&str] = &[
    "Проект демонстрирует высокое качество производства.",
    "Игровая индустрия продолжает удивлять инновациями.",
    "Ожидается, что релиз задаст новые стандарты.",
];

/// Terms bold-wrapped wherever they occur in the styled text.
const STYLED_KEYWORDS: &[&str] = &[
    "релиз",
    "геймплей",
    "трейлер",
    "обновление",
    "патч",
    "DLC",
    "эксклюзив",
    "консоль",
    "ПК",
    "мультиплеер",
    "одиночная",
    "графика",
    "производительность",
    "частота кадров",
    "разрешение",
    "анонс",
    "отложен",
    "отменен",
    "студия",
    "разработчик",
    "издатель",
];

/// Thematic emoji prefixes, first match wins; at most one is prepended.
const EMOJI_PREFIXES: &[(&[&str], &str)] = &[
    (&["релиз", "выход"], "🚀"),
    (&["трейлер", "геймплей"], "🎬"),
    (&["обновление", "патч"], "🛠️"),
];

/// Canned content stubs for the curated fallback post.
pub const CURATED_STUBS: &[&str] = &[
    "{entity} анонсирует новый игровой проект с инновационным геймплеем.",
    "Скоро выйдет долгожданное обновление от {entity} с новым контентом.",
    "{entity} представляет революционные технологии в игровой индустрии.",
    "Эксклюзивный релиз от {entity} готовится к запуску на всех платформах.",
    "{entity} инвестирует в развитие игровых сервисов и экосистемы.",
];

pub fn interpolate_entity(template: &str, entity: &str) -> String {
    template.replace("{entity}", entity)
}

fn keyword_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        STYLED_KEYWORDS
            .iter()
            .map(|keyword| Regex::new(&format!("(?i){}", regex::escape(keyword))).unwrap())
            .collect()
    })
}

#[derive(Serialize)]
struct LayoutData<'a> {
    emoji: &'a str,
    header: String,
    content: &'a str,
    insight: String,
    cta: String,
}

pub struct Composer<P> {
    markup: Box<dyn Markup>,
    picker: P,
    templates: handlebars::Handlebars<'static>,
}

impl<P: Pick> Composer<P> {
    pub fn new(markup: Box<dyn Markup>, picker: P) -> Self {
        Self {
            markup,
            picker,
            templates: template::new(),
        }
    }

    /// Produces a ready-to-deliver post from an entity and its source text.
    /// `raw` drives classification; `translated` is what the reader sees.
    pub fn compose(&mut self, entity: &Entity, raw: &str, translated: &str) -> Result<String> {
        let title = self.generate_title(&entity.name, raw);
        let content = self.enhance(translated, &entity.name);
        let insight = self.generate_insight(raw);

        let layout = *self
            .picker
            .pick(&Template::ALL)
            .unwrap_or(&Template::Newsy);

        let (header, insight, cta) = match layout {
            Template::Newsy => (
                self.markup.header(&title, "📰"),
                insight,
                self.markup.italic("Обсуждаем в комментариях!"),
            ),
            Template::Arcade => (
                self.markup.header(&title, "🎲"),
                self.markup.highlight(&insight),
                self.markup.italic("Ваше мнение о новости?"),
            ),
            Template::Technical => (
                self.markup.bold(&title),
                insight,
                self.markup.italic("Ждем ваши мысли!"),
            ),
            Template::Community => (
                self.markup.header(&title, "👥"),
                insight,
                self.markup.italic("Присоединяйтесь к обсуждению!"),
            ),
        };

        let data = LayoutData {
            emoji: entity.emoji(),
            header,
            content: &content,
            insight,
            cta,
        };

        self.templates
            .render(layout.as_str(), &data)
            .with_context(|| format!("could not render the `{layout}` post layout"))
    }

    /// Classifies the source text and picks a title from the matching pool,
    /// extended with trailer- or release-themed variants when those keywords
    /// are present.
    fn generate_title(&mut self, entity: &str, raw: &str) -> String {
        let lower = raw.to_lowercase();
        let contains_any =
            |keywords: &[&str]| keywords.iter().any(|keyword| lower.contains(keyword));

        let pool: &[&str] = if contains_any(&["анонс", "announce", "анонсирова"]) {
            ANNOUNCEMENT_TITLES
        } else if contains_any(&["обзор", "review", "оценк"]) {
            REVIEW_TITLES
        } else if contains_any(&["обновлен", "update", "патч"]) {
            UPDATE_TITLES
        } else {
            BREAKING_TITLES
        };

        let mut candidates = pool.to_vec();

        if contains_any(&["трейлер", "trailer"]) {
            candidates.extend_from_slice(TRAILER_TITLES);
        } else if contains_any(&["релиз", "release", "выход"]) {
            candidates.extend_from_slice(RELEASE_TITLES);
        }

        let chosen = self.picker.pick(&candidates).copied().unwrap_or(pool[0]);

        interpolate_entity(chosen, entity)
    }

    /// Bold-wraps known gaming terms (casing preserved) and the entity name,
    /// and prepends at most one thematic emoji.
    fn enhance(&mut self, text: &str, entity: &str) -> String {
        let mut styled = text.to_string();

        let bold_template = self.markup.bold("${0}");
        for pattern in keyword_patterns() {
            styled = pattern
                .replace_all(&styled, bold_template.as_str())
                .into_owned();
        }

        if styled.contains(entity) {
            styled = styled.replace(entity, &self.markup.bold(entity));
        }

        let lower = styled.to_lowercase();
        for (keywords, emoji) in EMOJI_PREFIXES {
            if keywords.iter().any(|keyword| lower.contains(keyword)) {
                styled = format!("{emoji} {styled}");
                break;
            }
        }

        styled
    }

    /// One insight template plus one supplementary fact, both from the theme
    /// bucket the source text classifies into.
    fn generate_insight(&mut self, raw: &str) -> String {
        let lower = raw.to_lowercase();

        let theme = THEME_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| lower.contains(keyword)))
            .map(|(theme, _)| *theme)
            .unwrap_or(Theme::General);

        let (insights, facts) = match theme {
            Theme::Release => (RELEASE_INSIGHTS, RELEASE_FACTS),
            Theme::Update => (UPDATE_INSIGHTS, UPDATE_FACTS),
            Theme::Trailer => (TRAILER_INSIGHTS, TRAILER_FACTS),
            Theme::Dlc => (DLC_INSIGHTS, DLC_FACTS),
            Theme::General => (GENERAL_INSIGHTS, GENERAL_FACTS),
        };

        let (emoji, label, rest) = self.picker.pick(insights).unwrap_or(&insights[0]);
        let fact = self.picker.pick(facts).copied().unwrap_or(facts[0]);

        format!("{emoji} {}{rest} {fact}", self.markup.bold(label))
    }
}

#[cfg(test)]
pub(crate) struct FirstPick;

#[cfg(test)]
impl Pick for FirstPick {
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.first()
    }
}

#[cfg(test)]
mod tests {
    use crate::compose::style::{PlainText, TelegramHtml};
    use crate::entity::Entity;

    use super::{Composer, FirstPick};

    fn entity() -> Entity {
        Entity {
            name: "Nintendo".into(),
            emoji: Some("🎮".into()),
        }
    }

    fn composer() -> Composer<FirstPick> {
        Composer::new(Box::new(TelegramHtml), FirstPick)
    }

    #[test]
    fn composed_post_contains_the_bolded_entity() {
        let raw = "Nintendo announces new Zelda update. More details inside.";
        let translated = "Nintendo выпускает обновление для Zelda.";

        let post = composer().compose(&entity(), raw, translated).unwrap();

        assert!(!post.is_empty());
        assert!(post.contains("<b>Nintendo</b>"), "post was: {post}");
    }

    #[test]
    fn announcement_keywords_pick_the_announcement_pool() {
        let raw = "Nintendo announces a new project";

        let title = composer().generate_title("Nintendo", raw);

        assert_eq!(title, "Nintendo анонсирует новый проект");
    }

    #[test]
    fn trailer_keywords_extend_the_pool_over_release_ones() {
        struct LastPick;

        impl super::Pick for LastPick {
            fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
                items.last()
            }
        }

        let mut composer = Composer::new(Box::new(TelegramHtml), LastPick);
        let raw = "trailer and release date revealed";

        let title = composer.generate_title("Halo", raw);

        // the pool tail is a trailer variant: when both keyword groups are
        // present, only the trailer extension applies
        assert_eq!(title, "ВИЗУАЛЬНАЯ ФАНТАСТИКА: Halo");
    }

    #[test]
    fn keyword_bolding_preserves_casing() {
        let mut composer = composer();

        let styled = composer.enhance("Патч выходит завтра", "Halo");

        assert!(styled.contains("<b>Патч</b>"), "styled was: {styled}");
    }

    #[test]
    fn at_most_one_emoji_is_prepended() {
        let mut composer = composer();

        // both release and update keywords present; release wins
        let styled = composer.enhance("релиз и обновление", "Halo");

        assert!(styled.starts_with("🚀 "), "styled was: {styled}");
        assert!(!styled.contains("🛠️"));
    }

    #[test]
    fn insight_uses_the_release_bucket() {
        let mut composer = composer();

        let insight = composer.generate_insight("the release is coming");

        assert!(insight.contains("ВАЖНЫЙ РЕЛИЗ"), "insight was: {insight}");
        assert!(
            insight.contains("Ожидается высокий спрос"),
            "insight was: {insight}"
        );
    }

    #[test]
    fn plain_text_markup_produces_no_tags() {
        let mut composer = Composer::new(Box::new(PlainText), FirstPick);
        let raw = "Nintendo announces new Zelda update";

        let post = composer
            .compose(&entity(), raw, "Nintendo выпускает обновление.")
            .unwrap();

        assert!(!post.contains("<b>"));
        assert!(!post.contains("<i>"));
    }
}
