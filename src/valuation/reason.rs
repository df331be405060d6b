use crate::config::farming_thresholds::*;
use crate::types::Restriction;
use crate::valuation::restrictions::{area_label, area_note};

/// The facts an explanation may refer to.
#[derive(Debug, Clone, Copy)]
pub struct Facts<'a> {
    pub name: &'a str,
    pub chaos_value: f64,
    pub weight: f64,
    pub percentile_rank: f64,
    pub restriction: Restriction,
}

/// Build the human-readable justification for a verdict.
///
/// Positive verdicts pick the first matching lead (area, boss, top 20%,
/// top 40%, high value) and add a value/weight footnote for unrestricted
/// cards. Negative verdicts list every fact that applies.
pub fn explain(facts: &Facts<'_>, worth_farming: bool) -> String {
    let parts = if worth_farming {
        positive(facts)
    } else {
        negative(facts)
    };
    format!("{}.", parts.join(". "))
}

fn positive(f: &Facts<'_>) -> Vec<String> {
    let mut parts = Vec::new();
    match f.restriction {
        Restriction::Area => {
            parts.push(format!(
                "This card only drops in specific areas ({:.1} chaos value)",
                f.chaos_value
            ));
            if let Some(note) = area_note(f.name) {
                parts.push(note.to_string());
            }
            parts.push("Only farm if you're specifically targeting this content".to_string());
        }
        Restriction::Boss => {
            parts.push(format!(
                "This card drops from specific bosses and has high value ({:.1} chaos)",
                f.chaos_value
            ));
            parts.push(
                "Consider farming if you're already running these bosses for other reasons"
                    .to_string(),
            );
        }
        Restriction::None => {
            let lead = if f.percentile_rank <= TOP_TIER_PERCENTILE {
                "This card is among the top 20% most efficient to farm".to_string()
            } else if f.percentile_rank <= EFFICIENT_PERCENTILE {
                "This card is in the top 40% of farming efficiency".to_string()
            } else {
                format!(
                    "This card's high value ({:.1} chaos) makes it worth farming despite lower drop rate",
                    f.chaos_value
                )
            };
            parts.push(lead);

            if f.chaos_value > HIGH_VALUE_CHAOS {
                parts.push(format!("High value card ({:.1} chaos)", f.chaos_value));
            } else if f.weight > FREQUENT_DROP_WEIGHT {
                parts.push(format!("Drops relatively frequently (weight: {})", f.weight));
            }
        }
    }
    parts
}

fn negative(f: &Facts<'_>) -> Vec<String> {
    let mut parts = Vec::new();
    match f.restriction {
        Restriction::Area => {
            parts.push(format!("Drops only in specific areas ({})", area_label(f.name)));
            parts.push(
                "Not worth specifically targeting unless you're already running this content"
                    .to_string(),
            );
        }
        Restriction::Boss => parts.push(format!(
            "Drops only from specific bosses ({:.1} chaos value is not high enough to justify boss farming)",
            f.chaos_value
        )),
        Restriction::None if f.percentile_rank > EFFICIENT_PERCENTILE => parts.push(format!(
            "Only ranked in the top {:.0}% for farming efficiency",
            f.percentile_rank
        )),
        Restriction::None => {}
    }

    if f.chaos_value < EFFICIENT_MIN_CHAOS {
        parts.push(format!("Low value ({:.1} chaos)", f.chaos_value));
    }

    if !f.restriction.is_restricted()
        && f.weight < RARE_DROP_WEIGHT
        && f.chaos_value < RARE_DROP_MIN_CHAOS
    {
        parts.push(format!(
            "Rare drop (weight: {}) without enough value to justify farming",
            f.weight
        ));
    }

    if parts.is_empty() {
        parts.push("Not efficient enough to be worth farming".to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(name: &str, chaos: f64, weight: f64, rank: f64, restriction: Restriction) -> Facts<'_> {
        Facts {
            name,
            chaos_value: chaos,
            weight,
            percentile_rank: rank,
            restriction,
        }
    }

    #[test]
    fn area_restricted_positive_names_the_area() {
        let text = explain(&facts("House of Mirrors", 22539.6, 1.0, 0.0, Restriction::Area), true);
        assert!(text.starts_with("This card only drops in specific areas (22539.6 chaos value)"));
        assert!(text.contains("Alluring Abyss"));
        assert!(text.ends_with("targeting this content."));
        assert!(!text.contains(".."));
    }

    #[test]
    fn boss_restricted_positive() {
        let text = explain(&facts("The Cheater", 5250.0, 3.0, 0.0, Restriction::Boss), true);
        assert!(text.starts_with("This card drops from specific bosses"));
        assert!(!text.contains("High value card"));
    }

    #[test]
    fn positive_precedence_for_unrestricted() {
        let top = explain(&facts("Loyalty", 5.0, 34668.0, 10.0, Restriction::None), true);
        assert!(top.starts_with("This card is among the top 20%"));
        assert!(top.contains("Drops relatively frequently (weight: 34668)"));

        let forty = explain(&facts("Loyalty", 5.0, 500.0, 40.0, Restriction::None), true);
        assert_eq!(forty, "This card is in the top 40% of farming efficiency.");

        let valuable = explain(&facts("The Nurse", 1187.5, 97.0, 55.0, Restriction::None), true);
        assert!(valuable.starts_with("This card's high value (1187.5 chaos)"));
        assert!(valuable.ends_with("High value card (1187.5 chaos)."));
    }

    #[test]
    fn negative_collects_every_fact() {
        let text = explain(&facts("Dust", 0.5, 50.0, 80.0, Restriction::None), false);
        assert_eq!(
            text,
            "Only ranked in the top 80% for farming efficiency. Low value (0.5 chaos). \
             Rare drop (weight: 50) without enough value to justify farming."
        );
    }

    #[test]
    fn negative_restricted() {
        let boss = explain(&facts("The Fortunate", 20.0, 10.0, 5.0, Restriction::Boss), false);
        assert!(boss.contains("20.0 chaos value is not high enough"));
        assert!(!boss.contains("Rare drop"));

        let area = explain(&facts("The Fiend", 80.0, 5.0, 5.0, Restriction::Area), false);
        assert!(area.starts_with("Drops only in specific areas (special content)"));
    }
}
