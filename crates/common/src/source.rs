//! Source specifications for a composite artifact
//!
//! A commit request names its inputs as "participant:resource" pairs, e.g.
//! `"node-a:cat.jpg"`. The coordinator partitions these by participant when
//! building per-destination proposals.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

const SEP: char = ':';

/// One source file of a composite artifact: which participant holds it and
/// the resource name on that participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub participant: String,
    pub resource: String,
}

impl Source {
    /// Parse a "participant:resource" spec
    pub fn parse(spec: &str) -> Result<Self, String> {
        match spec.split_once(SEP) {
            Some((participant, resource)) if !participant.is_empty() && !resource.is_empty() => {
                Ok(Self {
                    participant: participant.to_string(),
                    resource: resource.to_string(),
                })
            }
            _ => Err(format!("Invalid source spec: {:?}", spec)),
        }
    }

    /// Parse a full source list, preserving order
    pub fn parse_all(specs: &[String]) -> Result<Vec<Self>, String> {
        specs.iter().map(|s| Self::parse(s)).collect()
    }

    /// The distinct participants named by a source list
    pub fn participants(sources: &[Source]) -> BTreeSet<String> {
        sources.iter().map(|s| s.participant.clone()).collect()
    }

    /// Partition a source list into per-participant resource name lists,
    /// preserving the order of the original list within each participant.
    pub fn partition(sources: &[Source]) -> HashMap<String, Vec<String>> {
        let mut by_participant: HashMap<String, Vec<String>> = HashMap::new();
        for source in sources {
            by_participant
                .entry(source.participant.clone())
                .or_default()
                .push(source.resource.clone());
        }
        by_participant
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.participant, SEP, self.resource)
    }
}
