//! Word categories and the inbound → outbound event-type routing table.

use std::fmt;

/// One of the ten grammatical word classes used by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Noun,
    Verb,
    Exclamation,
    Adverb,
    PluralNoun,
    Adjective,
    Color,
    Name,
    Animal,
    Verbing,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Noun,
        Category::Verb,
        Category::Exclamation,
        Category::Adverb,
        Category::PluralNoun,
        Category::Adjective,
        Category::Color,
        Category::Name,
        Category::Animal,
        Category::Verbing,
    ];

    /// Tag as it appears in event types and in the catalog resource.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Noun => "noun",
            Category::Verb => "verb",
            Category::Exclamation => "exclamation",
            Category::Adverb => "adverb",
            Category::PluralNoun => "pluralnoun",
            Category::Adjective => "adjective",
            Category::Color => "color",
            Category::Name => "name",
            Category::Animal => "animal",
            Category::Verbing => "verbing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognized inbound event type and what it answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub found_type: &'static str,
    pub category: Category,
    pub picked_type: &'static str,
}

const fn route_for(
    found_type: &'static str,
    category: Category,
    picked_type: &'static str,
) -> Route {
    Route {
        found_type,
        category,
        picked_type,
    }
}

/// Every inbound type the responder answers. Adding a category is a row here.
///
/// `word.picked.exlamation` is a frozen wire string: existing game clients
/// subscribe to that exact spelling.
pub const ROUTES: [Route; 10] = [
    route_for("word.found.noun", Category::Noun, "word.picked.noun"),
    route_for("word.found.verb", Category::Verb, "word.picked.verb"),
    route_for(
        "word.found.exclamation",
        Category::Exclamation,
        "word.picked.exlamation",
    ),
    route_for("word.found.adverb", Category::Adverb, "word.picked.adverb"),
    route_for(
        "word.found.pluralnoun",
        Category::PluralNoun,
        "word.picked.pluralnoun",
    ),
    route_for(
        "word.found.adjective",
        Category::Adjective,
        "word.picked.adjective",
    ),
    route_for("word.found.color", Category::Color, "word.picked.color"),
    route_for("word.found.name", Category::Name, "word.picked.name"),
    route_for("word.found.animal", Category::Animal, "word.picked.animal"),
    route_for("word.found.verbing", Category::Verbing, "word.picked.verbing"),
];

/// Exact, case-sensitive lookup of an inbound event type.
pub fn route(found_type: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|r| r.found_type == found_type)
}
