//! The JSON descriptor format: an array of objects, one per package.

use indexmap::IndexMap;

use super::types::{AttrValue, DescriptorError, RawRecord};

/// Parse a JSON descriptor list.
///
/// Every object needs a string `name`; all other values must be strings or
/// arrays of strings. Key order inside an object is kept.
pub fn parse_json(input: &str) -> Result<Vec<RawRecord>, DescriptorError> {
  let entries: Vec<IndexMap<String, AttrValue>> = serde_json::from_str(input)?;

  entries
    .into_iter()
    .enumerate()
    .map(|(index, mut attrs)| {
      let name = match attrs.shift_remove("name") {
        Some(AttrValue::Single(name)) => name,
        _ => return Err(DescriptorError::MissingName { index }),
      };
      Ok(RawRecord { name, attrs })
    })
    .collect()
}
