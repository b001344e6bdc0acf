//! Fleet-wide aggregation state
//!
//! Owned exclusively by the aggregator actor. Counters only move on the first
//! sighting of a catalog number: an entity contributes to exactly one type
//! bucket and one country bucket for its whole lifetime, keyed by what it
//! reported the first time it was seen. Later updates only replace its entry
//! in the entity list.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::records::{CatalogNumber, EntitySummary};

/// Country bucket used when a record carries no country code
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Classification buckets for tracked objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectClass {
    Payload,
    Debris,
    RocketBody,
}

impl ObjectClass {
    pub const ALL: [ObjectClass; 3] = [
        ObjectClass::Payload,
        ObjectClass::Debris,
        ObjectClass::RocketBody,
    ];

    /// Anything that is neither a payload nor debris counts as a rocket body
    pub fn classify(object_type: Option<&str>) -> Self {
        match object_type {
            Some("PAYLOAD") => ObjectClass::Payload,
            Some("DEBRIS") => ObjectClass::Debris,
            _ => ObjectClass::RocketBody,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ObjectClass::Payload => "PAYLOAD",
            ObjectClass::Debris => "DEBRIS",
            ObjectClass::RocketBody => "ROCKET_BODY",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ObjectClass::Payload => "Payload",
            ObjectClass::Debris => "Debris",
            ObjectClass::RocketBody => "Rocket Body",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ObjectClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "payload" => Ok(ObjectClass::Payload),
            "debris" => Ok(ObjectClass::Debris),
            "rocketbody" => Ok(ObjectClass::RocketBody),
            _ => Err(format!("unknown object class '{s}'")),
        }
    }
}

/// Display name plus tally, as exposed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

/// What an upsert did to the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First time this catalog number was seen; counters moved
    FirstSighting { class: ObjectClass },

    /// Known entity; only its entry in the entity list was replaced
    Updated,
}

/// Fleet-wide indices and derived counts
#[derive(Debug, Clone)]
pub struct AggregationState {
    all_entities: HashMap<CatalogNumber, EntitySummary>,

    /// Catalog numbers per class, fixed at first sighting
    members: BTreeMap<ObjectClass, BTreeSet<CatalogNumber>>,

    by_type: BTreeMap<ObjectClass, NamedCount>,
    by_country: BTreeMap<String, NamedCount>,
}

impl Default for AggregationState {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationState {
    pub fn new() -> Self {
        let members = ObjectClass::ALL
            .into_iter()
            .map(|class| (class, BTreeSet::new()))
            .collect();
        let by_type = ObjectClass::ALL
            .into_iter()
            .map(|class| {
                (
                    class,
                    NamedCount {
                        name: class.display_name().to_string(),
                        count: 0,
                    },
                )
            })
            .collect();

        Self {
            all_entities: HashMap::new(),
            members,
            by_type,
            by_country: BTreeMap::new(),
        }
    }

    /// Apply one entity summary
    pub fn add_or_update_entity(&mut self, summary: EntitySummary) -> Upsert {
        let key = summary.catalog_number.clone();

        let outcome = if self.all_entities.contains_key(&key) {
            Upsert::Updated
        } else {
            let class = ObjectClass::classify(summary.object_type.as_deref());
            self.members.entry(class).or_default().insert(key.clone());
            self.recompute_type_count(class);

            let country = summary
                .country_code
                .clone()
                .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());
            let entry = self
                .by_country
                .entry(country.clone())
                .or_insert_with(|| NamedCount {
                    name: country.clone(),
                    count: 0,
                });
            entry.count += 1;
            entry.name = country;

            trace!("first sighting of {key} as {class}");
            Upsert::FirstSighting { class }
        };

        self.all_entities.insert(key, summary);
        outcome
    }

    fn recompute_type_count(&mut self, class: ObjectClass) {
        let size = self.members.get(&class).map_or(0, BTreeSet::len);
        let entry = self.by_type.entry(class).or_insert_with(|| NamedCount {
            name: class.display_name().to_string(),
            count: 0,
        });
        if entry.count != size {
            entry.count = size;
            entry.name = class.display_name().to_string();
        }
    }

    pub fn entity(&self, catalog_number: &str) -> Option<&EntitySummary> {
        self.all_entities.get(catalog_number)
    }

    pub fn len(&self) -> usize {
        self.all_entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_entities.is_empty()
    }

    pub fn by_type(&self) -> &BTreeMap<ObjectClass, NamedCount> {
        &self.by_type
    }

    pub fn by_country(&self) -> &BTreeMap<String, NamedCount> {
        &self.by_country
    }

    pub fn type_count(&self, class: ObjectClass) -> usize {
        self.by_type.get(&class).map_or(0, |c| c.count)
    }

    pub fn country_count(&self, country: &str) -> usize {
        self.by_country.get(country).map_or(0, |c| c.count)
    }

    /// Current summaries of every entity first classified as `class`
    pub fn members_of(&self, class: ObjectClass) -> Vec<EntitySummary> {
        self.members
            .get(&class)
            .into_iter()
            .flatten()
            .filter_map(|key| self.all_entities.get(key).cloned())
            .collect()
    }

    /// All summaries, ordered by catalog number
    pub fn entities(&self) -> Vec<EntitySummary> {
        let mut entities: Vec<_> = self.all_entities.values().cloned().collect();
        entities.sort_by(|a, b| a.catalog_number.cmp(&b.catalog_number));
        entities
    }
}
