//! Decoding repaired journal arrays into vote records

use serde::Deserialize;
use serde_json::Value;

use crate::schema::{Choice, VoteRecord};

/// Every field is optional: only the array and object structure is
/// enforced, odd field values are data.
#[derive(Debug, Deserialize)]
struct JournalEntry {
    #[serde(default)]
    castvote: Option<CastVote>,
}

#[derive(Debug, Default, Deserialize)]
struct CastVote {
    #[serde(default)]
    ticket: Value,
    #[serde(default)]
    votebit: Value,
}

impl CastVote {
    /// Missing or null reads as empty; other scalars keep their JSON text
    fn ticket(&self) -> String {
        match &self.ticket {
            Value::String(ticket) => ticket.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn choice(&self) -> Choice {
        match &self.votebit {
            Value::String(bit) => Choice::from_vote_bit(bit),
            _ => Choice::Unknown,
        }
    }
}

/// Decode array text produced by the journal repair step.
///
/// Only a structurally invalid array is an error; vote bits map totally
/// onto [`Choice`].
pub fn decode_votes(array: &str) -> Result<Vec<VoteRecord>, serde_json::Error> {
    let entries: Vec<JournalEntry> = serde_json::from_str(array)?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let castvote = entry.castvote.unwrap_or_default();
            VoteRecord {
                ticket: castvote.ticket(),
                choice: castvote.choice(),
            }
        })
        .collect())
}
