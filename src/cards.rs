//! Immutable card model.
//!
//! A [`Card`] is constructed once from an identification result (webhook
//! payload enriched by the lookup collaborator) and then only read — the
//! evaluator consumes it, the ledger archives it. Field names follow the
//! webhook payload, and every field defaults when absent so a sparse
//! payload still deserializes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Enumerated attributes
// ---------------------------------------------------------------------------

/// Card rarity. Identification sources disagree on spelling ("mythic",
/// "M", "Mythic Rare"), so parsing is lenient; anything unrecognised
/// lands in `Other` rather than failing the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Mythic,
    #[default]
    Other,
}

impl Rarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Mythic => "mythic",
            Self::Other => "other",
        }
    }

    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "common" => Self::Common,
            "u" | "uncommon" => Self::Uncommon,
            "r" | "rare" => Self::Rare,
            "m" | "mythic" | "mythic rare" => Self::Mythic,
            _ => Self::Other,
        }
    }
}

/// Card finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Finish {
    #[default]
    Regular,
    Foil,
    Other,
}

impl Finish {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Foil => "foil",
            Self::Other => "other",
        }
    }

    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "regular" | "nonfoil" | "normal" => Self::Regular,
            "foil" | "etched" => Self::Foil,
            _ => Self::Other,
        }
    }
}

impl Serialize for Rarity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Rarity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

impl Serialize for Finish {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Finish {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// A fully identified card. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Card {
    pub name: String,
    pub edition: String,
    pub rarity: Rarity,
    /// Market price in currency units.
    pub price: f64,
    pub finish: Finish,
    /// Converted mana cost. The lookup source reports this as a JSON
    /// number that may carry a fractional part; it is truncated here.
    #[serde(deserialize_with = "cmc_from_number")]
    pub cmc: u32,
    pub colors: Vec<String>,
    pub color_identity: Vec<String>,
    pub type_line: String,
    pub keywords: Vec<String>,
}

fn cmc_from_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    Ok(if raw.is_finite() && raw > 0.0 { raw as u32 } else { 0 })
}

// ---------------------------------------------------------------------------
// Typed field access
// ---------------------------------------------------------------------------

/// The card attributes a rule condition may name. Serde names match the
/// rule-list JSON the dashboard collaborator edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Price,
    Cmc,
    Rarity,
    ColorIdentity,
    Colors,
    TypeLine,
    Name,
    Edition,
    Keywords,
    Finish,
}

/// A borrowed view of one card attribute, shaped for the evaluator:
/// numbers compare, text substring-matches, sets membership-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
    Set(&'a [String]),
}

impl Card {
    /// Typed accessor used by the rule evaluator.
    pub fn field(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::Price => FieldValue::Number(self.price),
            Field::Cmc => FieldValue::Number(f64::from(self.cmc)),
            Field::Rarity => FieldValue::Text(self.rarity.as_str()),
            Field::ColorIdentity => FieldValue::Set(&self.color_identity),
            Field::Colors => FieldValue::Set(&self.colors),
            Field::TypeLine => FieldValue::Text(&self.type_line),
            Field::Name => FieldValue::Text(&self.name),
            Field::Edition => FieldValue::Text(&self.edition),
            Field::Keywords => FieldValue::Set(&self.keywords),
            Field::Finish => FieldValue::Text(self.finish.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_webhook_payload() {
        let json = r#"{
            "name": "Birds of Paradise",
            "edition": "Ravnica Remastered",
            "rarity": "R",
            "price": 8.36,
            "finish": "regular",
            "cmc": 1.0,
            "colors": ["G"],
            "color_identity": ["G"],
            "type_line": "Creature — Bird",
            "keywords": ["Flying"]
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.name, "Birds of Paradise");
        assert_eq!(card.rarity, Rarity::Rare);
        assert_eq!(card.cmc, 1);
        assert_eq!(card.color_identity, vec!["G".to_string()]);
    }

    #[test]
    fn sparse_payload_fills_defaults() {
        let card: Card = serde_json::from_str(r#"{"name": "Unknown"}"#).unwrap();
        assert_eq!(card.price, 0.0);
        assert_eq!(card.cmc, 0);
        assert_eq!(card.rarity, Rarity::Other);
        assert_eq!(card.finish, Finish::Regular);
        assert!(card.colors.is_empty());
    }

    #[test]
    fn rarity_parsing_is_lenient() {
        assert_eq!(Rarity::parse("mythic"), Rarity::Mythic);
        assert_eq!(Rarity::parse("M"), Rarity::Mythic);
        assert_eq!(Rarity::parse("Mythic Rare"), Rarity::Mythic);
        assert_eq!(Rarity::parse("special"), Rarity::Other);
        assert_eq!(Rarity::parse("C"), Rarity::Common);
    }

    #[test]
    fn finish_parsing_is_lenient() {
        assert_eq!(Finish::parse("nonfoil"), Finish::Regular);
        assert_eq!(Finish::parse("Foil"), Finish::Foil);
        assert_eq!(Finish::parse(""), Finish::Regular);
        assert_eq!(Finish::parse("gilded"), Finish::Other);
    }

    #[test]
    fn field_accessor_shapes() {
        let card = Card {
            price: 3.5,
            cmc: 2,
            type_line: "Instant".into(),
            colors: vec!["U".into()],
            ..Card::default()
        };
        assert_eq!(card.field(Field::Price), FieldValue::Number(3.5));
        assert_eq!(card.field(Field::Cmc), FieldValue::Number(2.0));
        assert_eq!(card.field(Field::TypeLine), FieldValue::Text("Instant"));
        assert!(matches!(card.field(Field::Colors), FieldValue::Set(s) if s.len() == 1));
    }

    #[test]
    fn negative_or_bogus_cmc_clamps_to_zero() {
        let card: Card = serde_json::from_str(r#"{"cmc": -3.0}"#).unwrap();
        assert_eq!(card.cmc, 0);
    }
}
