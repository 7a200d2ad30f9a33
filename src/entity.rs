use serde::Deserialize;

pub const DEFAULT_EMOJI: &str = "🎮";

/// A known gaming company or franchise from the configured catalog.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub name: String,

    #[serde(default)]
    pub emoji: Option<String>,
}

impl Entity {
    pub fn emoji(&self) -> &str {
        self.emoji.as_deref().unwrap_or(DEFAULT_EMOJI)
    }
}

/// Returns the first catalog entity whose name occurs in `text`.
///
/// Catalog order is a priority signal: no longest-match resolution is
/// attempted, so a publisher listed before its franchise wins even when both
/// occur in the text.
pub fn match_entity<'a>(text: &str, catalog: &'a [Entity]) -> Option<&'a Entity> {
    let text = text.to_lowercase();

    catalog
        .iter()
        .find(|entity| text.contains(&entity.name.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::{match_entity, Entity};

    fn catalog() -> Vec<Entity> {
        ["Nintendo", "The Legend of Zelda", "Mario"]
            .map(|name| Entity {
                name: name.into(),
                emoji: None,
            })
            .into()
    }

    #[test]
    fn earlier_catalog_entry_wins() {
        let catalog = catalog();
        let found = match_entity(
            "Nintendo announces a new The Legend of Zelda update",
            &catalog,
        );

        assert_eq!(found.map(|e| e.name.as_str()), Some("Nintendo"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let catalog = catalog();
        let found = match_entity("MARIO kart tournament dates revealed", &catalog);

        assert_eq!(found.map(|e| e.name.as_str()), Some("Mario"));
    }

    #[test]
    fn no_match_yields_none() {
        assert_eq!(match_entity("a quiet day in tech", &catalog()), None);
    }

    #[test]
    fn default_emoji_fills_in() {
        let entity = Entity {
            name: "Sega".into(),
            emoji: None,
        };

        assert_eq!(entity.emoji(), "🎮");
    }
}
