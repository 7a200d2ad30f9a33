use std::fmt::{self, Display};

use handlebars::Handlebars;

/// The fixed post layouts. Which one a post uses is picked at random per
/// invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Newsy,
    Arcade,
    Technical,
    Community,
}

impl Template {
    pub const ALL: [Template; 4] = [
        Template::Newsy,
        Template::Arcade,
        Template::Technical,
        Template::Community,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newsy => "newsy",
            Self::Arcade => "arcade",
            Self::Technical => "technical",
            Self::Community => "community",
        }
    }
}

impl Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

pub fn new() -> Handlebars<'static> {
    let mut tt = Handlebars::new();

    for (template, source) in [
        (Template::Newsy, include_str!("template/newsy.hbs")),
        (Template::Arcade, include_str!("template/arcade.hbs")),
        (Template::Technical, include_str!("template/technical.hbs")),
        (Template::Community, include_str!("template/community.hbs")),
    ] {
        tt.register_template_string(template.as_str(), source)
            .unwrap();
    }

    tt
}
