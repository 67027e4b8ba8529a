//! Shared, snapshotting rule store.
//!
//! The dashboard collaborator edits the rule list; the controller only
//! ever reads. [`RuleStore::snapshot`] hands out the current list as a
//! cheap `Arc` clone, so an evaluation in flight keeps the exact list it
//! started with — a concurrent [`RuleStore::replace`] is observed only by
//! evaluations that start afterwards, never as a torn read.

use std::sync::{Arc, PoisonError, RwLock};

use crate::cards::Field;

use super::{Operator, Pile, Rule, RuleValue};

/// Cloneable handle to the shared rule list.
#[derive(Clone)]
pub struct RuleStore {
    inner: Arc<RwLock<Arc<[Rule]>>>,
}

impl RuleStore {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(rules.into())),
        }
    }

    /// Store seeded with the factory rule set.
    pub fn with_defaults() -> Self {
        Self::new(Self::default_rules())
    }

    /// Immutable view of the current rule list.
    pub fn snapshot(&self) -> Arc<[Rule]> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new rule list. Takes effect for evaluations that start
    /// after this call returns.
    pub fn replace(&self, rules: Vec<Rule>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = rules.into();
    }

    /// Parse a rule list in the dashboard's `rules.json` shape.
    pub fn from_json(json: &str) -> serde_json::Result<Vec<Rule>> {
        serde_json::from_str(json)
    }

    /// Serialize the current list back to the `rules.json` shape.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.snapshot())
    }

    /// The factory rule set shipped with the machine.
    pub fn default_rules() -> Vec<Rule> {
        fn rule(name: &str, field: Field, operator: Operator, value: RuleValue, pile: u8) -> Rule {
            Rule {
                name: name.to_string(),
                field,
                operator,
                value,
                pile: Pile(pile),
            }
        }
        vec![
            rule("High Value", Field::Price, Operator::Gt, RuleValue::Number(5.0), 1),
            rule("Mythics", Field::Rarity, Operator::Eq, RuleValue::Text("mythic".into()), 2),
            rule("Rares", Field::Rarity, Operator::Eq, RuleValue::Text("rare".into()), 3),
            rule(
                "Blue Cards",
                Field::ColorIdentity,
                Operator::Contains,
                RuleValue::Text("U".into()),
                4,
            ),
            rule(
                "Creatures",
                Field::TypeLine,
                Operator::Contains,
                RuleValue::Text("Creature".into()),
                5,
            ),
        ]
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_isolated_from_replace() {
        let store = RuleStore::with_defaults();
        let before = store.snapshot();
        store.replace(Vec::new());
        // The old snapshot still sees the full list; a new one is empty.
        assert_eq!(before.len(), 5);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn default_rules_round_trip_through_json() {
        let store = RuleStore::with_defaults();
        let json = store.to_json().unwrap();
        let parsed = RuleStore::from_json(&json).unwrap();
        assert_eq!(parsed, RuleStore::default_rules());
    }

    #[test]
    fn parses_dashboard_rules_json() {
        let json = r#"[
            {"name": "High Value", "field": "price", "operator": ">", "value": 5, "pile": 1},
            {"name": "Blue", "field": "color_identity", "operator": "contains", "value": "U", "pile": 4}
        ]"#;
        let rules = RuleStore::from_json(json).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].pile, Pile(4));
    }

    #[test]
    fn clones_share_the_same_list() {
        let store = RuleStore::with_defaults();
        let alias = store.clone();
        alias.replace(Vec::new());
        assert!(store.snapshot().is_empty());
    }
}
