//! 📦 Common data structures, the building blocks of carseed.
//!
//! 🎬 COLD OPEN. EXT. USED CAR LOT, 3:47 AM
//!
//! Rows of sedans nobody ordered. A price tag flaps in the wind. Somewhere,
//! an ingestion endpoint waits for a JSON array of them. It will get one.
//! Eventually. Probably in batches of fifty. 🦆
//!
//! The dispatcher does not care what a `Car` is. It only knows the thing can be
//! serialized. The receiver, on the other hand, cares very much about the
//! camelCase field names, so those are pinned here.

use serde::{Deserialize, Serialize};

/// 🚗 One synthesized car listing. The atomic unit of everything this crate does.
///
/// Field names go over the wire as `normalizedMake`, `normalizedModel`, `year`,
/// `price`, `location`. Do not rename them unless the receiver renames them first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub normalized_make: String,
    pub normalized_model: String,
    pub year: u16,
    pub price: u32,
    pub location: String,
}
