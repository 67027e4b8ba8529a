//! Sorting rules and the rule evaluator.
//!
//! A rule list is an *ordered* sequence: the first rule whose condition
//! holds decides the destination pile. Conditions are a tagged operator
//! over one named card field — there is no expression language. Every
//! operator carries an explicit applicability check per field type, so an
//! inapplicable combination (`contains` on a price, `>` on a type line)
//! evaluates to *not matched*, never to an error.

pub mod store;

use core::cmp::Ordering as CmpOrdering;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::{Card, Field, FieldValue};

// ---------------------------------------------------------------------------
// Pile
// ---------------------------------------------------------------------------

/// A physical output bin a card can be routed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Pile(pub u8);

impl fmt::Display for Pile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pile {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Comparison operator of a rule condition. Serde names match the rule
/// JSON the dashboard edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "contains")]
    Contains,
}

/// Literal a rule compares against. Rule JSON carries either a number or
/// a string; a string that parses as a number is coerced when an ordering
/// operator needs one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
}

impl RuleValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

/// One ordered sorting rule. Its position in the list is its priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    pub field: Field,
    pub operator: Operator,
    pub value: RuleValue,
    pub pile: Pile,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Outcome of evaluating one card against a rule snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub pile: Pile,
    /// Position of the matched rule; `None` means no rule matched and
    /// `pile` is the default pile.
    pub matched: Option<usize>,
}

/// Pure first-match evaluation. Iterates the snapshot in order and
/// returns the first satisfied rule's pile together with its position;
/// falls through to `default_pile` with no match marker.
pub fn evaluate(card: &Card, rules: &[Rule], default_pile: Pile) -> RouteDecision {
    for (position, rule) in rules.iter().enumerate() {
        if condition_holds(card, rule) {
            return RouteDecision {
                pile: rule.pile,
                matched: Some(position),
            };
        }
    }
    RouteDecision {
        pile: default_pile,
        matched: None,
    }
}

fn condition_holds(card: &Card, rule: &Rule) -> bool {
    let field = card.field(rule.field);
    match rule.operator {
        Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le => {
            ordered(field, &rule.value, rule.operator)
        }
        Operator::Eq => equals(field, &rule.value),
        Operator::Ne => match field {
            // Negation only applies where equality does; `!=` against a
            // set field is inapplicable rather than vacuously true.
            FieldValue::Number(_) | FieldValue::Text(_) => !equals(field, &rule.value),
            FieldValue::Set(_) => false,
        },
        Operator::Contains => contains(field, &rule.value),
    }
}

fn ordered(field: FieldValue<'_>, value: &RuleValue, op: Operator) -> bool {
    let FieldValue::Number(lhs) = field else {
        return false;
    };
    let Some(rhs) = value.as_number() else {
        return false;
    };
    let Some(ord) = lhs.partial_cmp(&rhs) else {
        return false;
    };
    match op {
        Operator::Gt => ord == CmpOrdering::Greater,
        Operator::Lt => ord == CmpOrdering::Less,
        Operator::Ge => ord != CmpOrdering::Less,
        Operator::Le => ord != CmpOrdering::Greater,
        _ => false,
    }
}

fn equals(field: FieldValue<'_>, value: &RuleValue) -> bool {
    match field {
        FieldValue::Number(lhs) => match value.as_number() {
            Some(rhs) => lhs.partial_cmp(&rhs) == Some(CmpOrdering::Equal),
            None => false,
        },
        FieldValue::Text(lhs) => match value.as_text() {
            Some(rhs) => lhs.eq_ignore_ascii_case(rhs.trim()),
            None => false,
        },
        // Whole-set equality against a comma-separated literal, order-
        // and case-insensitive: "U,G" matches colors ["G", "U"].
        FieldValue::Set(items) => match value.as_text() {
            Some(rhs) => {
                let mut want: Vec<String> = rhs
                    .split(',')
                    .map(|t| t.trim().to_ascii_uppercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                let mut have: Vec<String> =
                    items.iter().map(|v| v.to_ascii_uppercase()).collect();
                want.sort();
                have.sort();
                want == have
            }
            None => false,
        },
    }
}

fn contains(field: FieldValue<'_>, value: &RuleValue) -> bool {
    match field {
        FieldValue::Number(_) => false,
        FieldValue::Text(haystack) => match value.as_text() {
            Some(needle) => haystack
                .to_ascii_lowercase()
                .contains(&needle.trim().to_ascii_lowercase()),
            None => false,
        },
        FieldValue::Set(items) => match value.as_text() {
            Some(needle) => items.iter().any(|v| v.eq_ignore_ascii_case(needle.trim())),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Rarity;

    fn rule(field: Field, operator: Operator, value: RuleValue, pile: u8) -> Rule {
        Rule {
            name: String::new(),
            field,
            operator,
            value,
            pile: Pile(pile),
        }
    }

    fn price_and_mythic_rules() -> Vec<Rule> {
        vec![
            rule(Field::Price, Operator::Gt, RuleValue::Number(5.0), 1),
            rule(
                Field::Rarity,
                Operator::Eq,
                RuleValue::Text("mythic".into()),
                2,
            ),
        ]
    }

    fn card(price: f64, rarity: Rarity) -> Card {
        Card {
            price,
            rarity,
            ..Card::default()
        }
    }

    #[test]
    fn first_match_wins_over_later_rules() {
        // price > 5 matches at position 0, so the mythic rule never runs.
        let decision = evaluate(
            &card(10.0, Rarity::Common),
            &price_and_mythic_rules(),
            Pile(0),
        );
        assert_eq!(decision.pile, Pile(1));
        assert_eq!(decision.matched, Some(0));
    }

    #[test]
    fn second_rule_matches_when_first_does_not() {
        let decision = evaluate(
            &card(1.0, Rarity::Mythic),
            &price_and_mythic_rules(),
            Pile(0),
        );
        assert_eq!(decision.pile, Pile(2));
        assert_eq!(decision.matched, Some(1));
    }

    #[test]
    fn no_match_falls_to_default_pile() {
        let decision = evaluate(
            &card(1.0, Rarity::Common),
            &price_and_mythic_rules(),
            Pile(0),
        );
        assert_eq!(decision.pile, Pile(0));
        assert_eq!(decision.matched, None);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let c = card(7.5, Rarity::Rare);
        let rules = price_and_mythic_rules();
        let first = evaluate(&c, &rules, Pile(0));
        let second = evaluate(&c, &rules, Pile(0));
        assert_eq!(first, second);
    }

    #[test]
    fn contains_on_set_is_membership_case_insensitive() {
        let c = Card {
            color_identity: vec!["u".into(), "G".into()],
            ..Card::default()
        };
        let r = rule(
            Field::ColorIdentity,
            Operator::Contains,
            RuleValue::Text("U".into()),
            4,
        );
        assert!(condition_holds(&c, &r));

        let miss = rule(
            Field::ColorIdentity,
            Operator::Contains,
            RuleValue::Text("B".into()),
            4,
        );
        assert!(!condition_holds(&c, &miss));
    }

    #[test]
    fn contains_on_text_is_substring_case_insensitive() {
        let c = Card {
            type_line: "Legendary Creature — Elf Druid".into(),
            ..Card::default()
        };
        let r = rule(
            Field::TypeLine,
            Operator::Contains,
            RuleValue::Text("creature".into()),
            5,
        );
        assert!(condition_holds(&c, &r));
    }

    #[test]
    fn contains_on_numeric_field_is_inapplicable() {
        let c = card(5.0, Rarity::Common);
        let r = rule(
            Field::Price,
            Operator::Contains,
            RuleValue::Text("5".into()),
            1,
        );
        assert!(!condition_holds(&c, &r));
    }

    #[test]
    fn ordering_on_text_field_is_inapplicable() {
        let c = card(0.0, Rarity::Mythic);
        let r = rule(
            Field::Rarity,
            Operator::Gt,
            RuleValue::Text("common".into()),
            1,
        );
        assert!(!condition_holds(&c, &r));
    }

    #[test]
    fn numeric_string_literal_coerces_for_ordering() {
        let c = card(10.0, Rarity::Common);
        let r = rule(Field::Price, Operator::Ge, RuleValue::Text("5".into()), 1);
        assert!(condition_holds(&c, &r));
    }

    #[test]
    fn non_numeric_literal_makes_ordering_inapplicable() {
        let c = card(10.0, Rarity::Common);
        let r = rule(
            Field::Price,
            Operator::Gt,
            RuleValue::Text("cheap".into()),
            1,
        );
        assert!(!condition_holds(&c, &r));
    }

    #[test]
    fn ne_is_inapplicable_on_sets() {
        let c = Card {
            colors: vec!["R".into()],
            ..Card::default()
        };
        let r = rule(Field::Colors, Operator::Ne, RuleValue::Text("U".into()), 1);
        assert!(!condition_holds(&c, &r), "!= on a set field must not match");
    }

    #[test]
    fn set_equality_against_comma_list() {
        let c = Card {
            color_identity: vec!["G".into(), "U".into()],
            ..Card::default()
        };
        let hit = rule(
            Field::ColorIdentity,
            Operator::Eq,
            RuleValue::Text("u,g".into()),
            3,
        );
        assert!(condition_holds(&c, &hit));

        let miss = rule(
            Field::ColorIdentity,
            Operator::Eq,
            RuleValue::Text("u".into()),
            3,
        );
        assert!(!condition_holds(&c, &miss));
    }

    #[test]
    fn cmc_compares_numerically() {
        let c = Card {
            cmc: 3,
            ..Card::default()
        };
        let r = rule(Field::Cmc, Operator::Le, RuleValue::Number(3.0), 2);
        assert!(condition_holds(&c, &r));
    }

    #[test]
    fn ne_on_text_matches_when_different() {
        let c = card(0.0, Rarity::Rare);
        let r = rule(
            Field::Rarity,
            Operator::Ne,
            RuleValue::Text("mythic".into()),
            1,
        );
        assert!(condition_holds(&c, &r));
        let same = rule(
            Field::Rarity,
            Operator::Ne,
            RuleValue::Text("RARE".into()),
            1,
        );
        assert!(!condition_holds(&c, &same));
    }

    #[test]
    fn rule_json_shape_matches_dashboard_format() {
        let json = r#"{
            "name": "High Value",
            "field": "price",
            "operator": ">",
            "value": 5,
            "pile": 1
        }"#;
        let r: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(r.field, Field::Price);
        assert_eq!(r.operator, Operator::Gt);
        assert_eq!(r.value, RuleValue::Number(5.0));
        assert_eq!(r.pile, Pile(1));

        let back = serde_json::to_string(&r).unwrap();
        let again: Rule = serde_json::from_str(&back).unwrap();
        assert_eq!(r, again);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::cards::Rarity;
    use proptest::prelude::*;

    fn arb_rule() -> impl Strategy<Value = Rule> {
        let field = prop_oneof![
            Just(Field::Price),
            Just(Field::Cmc),
            Just(Field::Rarity),
            Just(Field::TypeLine),
            Just(Field::ColorIdentity),
        ];
        let operator = prop_oneof![
            Just(Operator::Gt),
            Just(Operator::Lt),
            Just(Operator::Ge),
            Just(Operator::Le),
            Just(Operator::Eq),
            Just(Operator::Ne),
            Just(Operator::Contains),
        ];
        let value = prop_oneof![
            (-50.0f64..50.0).prop_map(RuleValue::Number),
            "[a-zA-Z]{0,8}".prop_map(RuleValue::Text),
        ];
        (field, operator, value, 0u8..8).prop_map(|(field, operator, value, pile)| Rule {
            name: String::new(),
            field,
            operator,
            value,
            pile: Pile(pile),
        })
    }

    fn arb_card() -> impl Strategy<Value = Card> {
        (
            0.0f64..100.0,
            0u32..12,
            prop_oneof![
                Just(Rarity::Common),
                Just(Rarity::Uncommon),
                Just(Rarity::Rare),
                Just(Rarity::Mythic),
            ],
            proptest::collection::vec("[WUBRG]", 0..4),
        )
            .prop_map(|(price, cmc, rarity, colors)| Card {
                price,
                cmc,
                rarity,
                colors,
                type_line: "Creature".into(),
                ..Card::default()
            })
    }

    proptest! {
        #[test]
        fn evaluation_is_deterministic(
            card in arb_card(),
            rules in proptest::collection::vec(arb_rule(), 0..10),
        ) {
            let a = evaluate(&card, &rules, Pile(0));
            let b = evaluate(&card, &rules, Pile(0));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn result_pile_is_a_rule_pile_or_the_default(
            card in arb_card(),
            rules in proptest::collection::vec(arb_rule(), 0..10),
        ) {
            let decision = evaluate(&card, &rules, Pile(0));
            match decision.matched {
                Some(i) => {
                    prop_assert!(i < rules.len());
                    prop_assert_eq!(decision.pile, rules[i].pile);
                    // First-match law: nothing before i may match.
                    for earlier in &rules[..i] {
                        prop_assert!(!super::condition_holds(&card, earlier));
                    }
                }
                None => prop_assert_eq!(decision.pile, Pile(0)),
            }
        }
    }
}
