// CSV decoding for uploaded customer files

use crate::error::ImportError;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One CSV row, keyed by the recognized column headers.
///
/// Values stay raw strings at decode time; coercion (booleans, dates)
/// happens when a merged entity is applied to the store. Columns a source
/// does not carry deserialize to `None`, and empty cells are tidied to
/// `None` so identity resolution only ever sees fields that hold a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,

    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    // Sources disagree on capitalization for this one column.
    #[serde(rename = "email", alias = "Email", default)]
    pub email: Option<String>,

    #[serde(rename = "Device Payment Plan", default)]
    pub device_payment_plan: Option<String>,

    #[serde(rename = "Credit Card Number", default)]
    pub credit_card: Option<String>,

    #[serde(rename = "Credit Card Type", default)]
    pub credit_card_type: Option<String>,

    #[serde(rename = "Account Last Payment Date", default)]
    pub last_payment_date: Option<String>,

    #[serde(rename = "Address", default)]
    pub address: Option<String>,

    #[serde(rename = "State", default)]
    pub state: Option<String>,

    #[serde(rename = "Postal Code", default)]
    pub postal_code: Option<String>,
}

impl RawRecord {
    /// Drop empty and whitespace-only cells.
    fn tidy(mut self) -> Self {
        for slot in self.slots() {
            if slot.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *slot = None;
            }
        }
        self
    }

    /// Overlay every field the other record actually carries onto this
    /// one, leaving the rest untouched. Later sources win on overlap.
    pub fn absorb(&mut self, other: &RawRecord) {
        let mut incoming = other.clone();
        for (slot, value) in self.slots().into_iter().zip(incoming.slots()) {
            if value.is_some() {
                *slot = value.take();
            }
        }
    }

    fn slots(&mut self) -> [&mut Option<String>; 10] {
        [
            &mut self.id,
            &mut self.name,
            &mut self.email,
            &mut self.device_payment_plan,
            &mut self.credit_card,
            &mut self.credit_card_type,
            &mut self.last_payment_date,
            &mut self.address,
            &mut self.state,
            &mut self.postal_code,
        ]
    }
}

/// Decode one file's content into ordered records.
///
/// Short rows are tolerated: missing trailing columns surface as absent
/// fields rather than aborting the file. A row the parser cannot make
/// sense of at all fails the whole file with a decode error tagged with
/// `label` (the filename the client sent).
pub fn decode_records<R: Read>(reader: R, label: &str) -> Result<Vec<RawRecord>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: RawRecord = result.map_err(|source| ImportError::Decode {
            file: label.to_string(),
            source,
        })?;
        records.push(record.tidy());
    }

    Ok(records)
}
