use crate::types::Restriction;

/// Cards that only drop from specific pinnacle bosses.
pub const BOSS_RESTRICTED: &[&str] = &[
    "A Fate Worse Than Death", // Conquerors
    "The Cheater",             // Uber Maven
    "The Fortunate",           // The Feared
    "Hunter's Reward",         // Hunter
    "The Strategist",          // Elder
    "The Escape",              // Maven
    "The Dragon's Heart",      // Shaper
    "Rebirth and Renewal",     // Maven
    "The Chosen",              // Shaper
    "The Eye of Terror",       // Elder
    "The World Eater",         // Uber Elder
];

/// Cards that only drop in special zones or high-end content.
pub const AREA_RESTRICTED: &[&str] = &[
    "House of Mirrors",        // Alluring Abyss (Uber Atziri)
    "The Doctor",              // high tier map strategies
    "The Demon",               // Uber Elder
    "The Fiend",               // Uber Atziri
    "Seven Years Bad Luck",    // Hall of Grandmasters
    "Unrequited Love",         // Shaper guardian maps
    "The Immortal",            // Uber Elder
    "The Damned",              // high level corrupted areas
    "Pride of the First Ones", // boss drops
    "Wealth and Power",        // high tier content
];

/// Exact, case-sensitive name match against the restriction lists.
pub fn classify(name: &str) -> Restriction {
    if AREA_RESTRICTED.contains(&name) {
        Restriction::Area
    } else if BOSS_RESTRICTED.contains(&name) {
        Restriction::Boss
    } else {
        Restriction::None
    }
}

/// Where an area-restricted card can be found, when it is worth spelling out.
pub fn area_note(name: &str) -> Option<&'static str> {
    match name {
        "House of Mirrors" => Some("Only drops in Alluring Abyss (Uber Atziri) or from Stacked Decks"),
        "The Doctor" => Some("Requires specific high-tier map farming strategies"),
        _ => None,
    }
}

/// Short name of the content an area-restricted card is tied to.
pub fn area_label(name: &str) -> &'static str {
    match name {
        "House of Mirrors" => "Alluring Abyss/Uber Atziri",
        _ => "special content",
    }
}
