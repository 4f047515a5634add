//! The indentation-based line format.

use std::fmt::Write;

use super::types::{AttrValue, ParseError, ParseErrorKind, RawRecord};

/// Parse the line format into records, in declaration order.
///
/// - `#` in the first column starts a comment line.
/// - `-` in the first column starts a package; the first token after it is
///   the package name.
/// - `key : value` sets a scalar attribute.
/// - `key :` followed by indented lines sets a list attribute. Indented lines
///   following an inline value extend it into a list as well. A blank or
///   unindented line ends the list.
///
/// The first malformed line aborts parsing.
pub fn parse_descriptors(input: &str) -> Result<Vec<RawRecord>, ParseError> {
  let lines: Vec<&str> = input.lines().collect();
  let mut records = Vec::new();
  let mut current: Option<RawRecord> = None;
  let mut idx = 0;

  while idx < lines.len() {
    let line = lines[idx];
    let line_no = idx + 1;
    idx += 1;

    if line.trim().is_empty() || line.starts_with('#') {
      continue;
    }

    let error = |kind| ParseError {
      line: line_no,
      text: line.to_string(),
      kind,
    };

    if let Some(rest) = line.strip_prefix('-') {
      let name = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| error(ParseErrorKind::MissingPackageName))?;
      if let Some(done) = current.take() {
        records.push(done);
      }
      current = Some(RawRecord::new(name));
      continue;
    }

    let (key, inline) = line.split_once(':').ok_or_else(|| error(ParseErrorKind::MissingColon))?;
    let key = key.trim();
    if key.is_empty() {
      return Err(error(ParseErrorKind::EmptyAttributeName));
    }
    let record = current
      .as_mut()
      .ok_or_else(|| error(ParseErrorKind::AttributeOutsidePackage))?;

    let inline = inline.trim();
    let mut items = Vec::new();
    if !inline.is_empty() {
      items.push(inline.to_string());
    }
    while idx < lines.len() && is_continuation(lines[idx]) {
      items.push(lines[idx].trim().to_string());
      idx += 1;
    }

    let value = if !inline.is_empty() && items.len() == 1 {
      AttrValue::Single(items.remove(0))
    } else {
      AttrValue::List(items)
    };

    if key == "name" {
      match value {
        AttrValue::Single(name) => record.name = name,
        AttrValue::List(_) => return Err(error(ParseErrorKind::ListValuedName)),
      }
      continue;
    }

    record.attrs.insert(key.to_string(), value);
  }

  if let Some(done) = current {
    records.push(done);
  }

  Ok(records)
}

fn is_continuation(line: &str) -> bool {
  line.starts_with(char::is_whitespace) && !line.trim().is_empty()
}

/// Render records back into the line format.
///
/// Parsing the output yields the same records.
pub fn write_descriptors(records: &[RawRecord]) -> String {
  let mut out = String::new();
  for (i, record) in records.iter().enumerate() {
    if i > 0 {
      out.push('\n');
    }
    let _ = writeln!(out, "- {}", record.name);
    for (key, value) in &record.attrs {
      match value {
        AttrValue::Single(value) => {
          let _ = writeln!(out, "{key} : {value}");
        }
        AttrValue::List(items) => {
          let _ = writeln!(out, "{key} :");
          for item in items {
            let _ = writeln!(out, "    {item}");
          }
        }
      }
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn single(v: &str) -> AttrValue {
    AttrValue::Single(v.to_string())
  }

  fn list(items: &[&str]) -> AttrValue {
    AttrValue::List(items.iter().map(|s| s.to_string()).collect())
  }

  #[test]
  fn parses_documented_example() {
    let input = "\
# This is a comment
- awesome_library
type : cmake
src : https://url/to/some.tar.bz2
options :
    CMAKE_OPTION_ONE ON
    CMAKE_OPTION_TWO OFF

- awesome_library2
type : header
";
    let records = parse_descriptors(input).unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.name, "awesome_library");
    assert_eq!(first.get("type"), Some(&single("cmake")));
    assert_eq!(first.get("src"), Some(&single("https://url/to/some.tar.bz2")));
    assert_eq!(
      first.get("options"),
      Some(&list(&["CMAKE_OPTION_ONE ON", "CMAKE_OPTION_TWO OFF"]))
    );
    assert_eq!(records[1].name, "awesome_library2");
  }

  #[test]
  fn header_takes_first_token() {
    let records = parse_descriptors("-   boost  extra words\ntype: boost\n").unwrap();
    assert_eq!(records[0].name, "boost");
  }

  #[test]
  fn empty_list_attribute() {
    let records = parse_descriptors("- a\noptions:\ntype: cmake\n").unwrap();
    assert_eq!(records[0].get("options"), Some(&AttrValue::List(vec![])));
    assert_eq!(records[0].get("type"), Some(&single("cmake")));
  }

  #[test]
  fn inline_value_with_continuation_becomes_list() {
    let input = "- a\noptions : FIRST 1\n\tSECOND 2\n  THIRD 3\n";
    let records = parse_descriptors(input).unwrap();
    assert_eq!(
      records[0].get("options"),
      Some(&list(&["FIRST 1", "SECOND 2", "THIRD 3"]))
    );
  }

  #[test]
  fn blank_line_terminates_list() {
    let input = "- a\noptions:\n  ONE 1\n\n  stray: value\n";
    let records = parse_descriptors(input).unwrap();
    assert_eq!(records[0].get("options"), Some(&list(&["ONE 1"])));
    // The indented line after the blank is an ordinary attribute line.
    assert_eq!(records[0].get("stray"), Some(&single("value")));
  }

  #[test]
  fn value_keeps_later_colons() {
    let records = parse_descriptors("- a\nsrc: https://host:8080/a.tgz\n").unwrap();
    assert_eq!(records[0].get("src"), Some(&single("https://host:8080/a.tgz")));
  }

  #[test]
  fn attribute_order_is_preserved() {
    let input = "- a\noptions+linux:\n  L 1\noptions:\n  U 1\noptions+!linux:\n  N 1\n";
    let records = parse_descriptors(input).unwrap();
    let keys: Vec<&str> = records[0].attrs.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["options+linux", "options", "options+!linux"]);
  }

  #[test]
  fn crlf_line_endings() {
    let records = parse_descriptors("- a\r\ntype : cmake\r\noptions :\r\n  X 1\r\n").unwrap();
    assert_eq!(records[0].get("type"), Some(&single("cmake")));
    assert_eq!(records[0].get("options"), Some(&list(&["X 1"])));
  }

  #[test]
  fn missing_colon_reports_line_number() {
    let err = parse_descriptors("- a\ntype: cmake\n\nthis is wrong\n").unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(err.text, "this is wrong");
    assert_eq!(err.kind, ParseErrorKind::MissingColon);
  }

  #[test]
  fn empty_attribute_name_is_rejected() {
    let err = parse_descriptors("- a\n : value\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.kind, ParseErrorKind::EmptyAttributeName);
  }

  #[test]
  fn dash_without_name_is_rejected() {
    let err = parse_descriptors("-\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MissingPackageName);
  }

  #[test]
  fn attribute_before_header_is_rejected() {
    let err = parse_descriptors("# deps\ntype: cmake\n- a\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.kind, ParseErrorKind::AttributeOutsidePackage);
  }

  #[test]
  fn name_attribute_renames_record() {
    let records = parse_descriptors("- a\nname: b\n").unwrap();
    assert_eq!(records[0].name, "b");
    assert!(records[0].get("name").is_none());
  }

  #[test]
  fn empty_input_has_no_records() {
    assert!(parse_descriptors("").unwrap().is_empty());
    assert!(parse_descriptors("# only a comment\n\n").unwrap().is_empty());
  }

  #[test]
  fn reparse_of_written_records_is_identity() {
    let input = "- a\ntype : cmake\noptions : ONE 1\n  TWO 2\nextra:\n- b\nsrc: x\n";
    let parsed = parse_descriptors(input).unwrap();
    let reparsed = parse_descriptors(&write_descriptors(&parsed)).unwrap();
    assert_eq!(parsed, reparsed);
  }

  fn value_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._/=+-]([A-Za-z0-9 ._/=:+-]{0,12}[A-Za-z0-9._/=+-])?"
  }

  fn attr_value() -> impl Strategy<Value = AttrValue> {
    prop_oneof![
      value_text().prop_map(AttrValue::Single),
      prop::collection::vec(value_text(), 0..4).prop_map(AttrValue::List),
    ]
  }

  fn record() -> impl Strategy<Value = RawRecord> {
    (
      "[a-z][a-z0-9_.-]{0,8}",
      prop::collection::vec(("[a-mo-z][a-z0-9_+!]{0,8}", attr_value()), 0..5),
    )
      .prop_map(|(name, attrs)| {
        let mut record = RawRecord::new(name);
        for (key, value) in attrs {
          record.attrs.insert(key, value);
        }
        record
      })
  }

  proptest! {
    #[test]
    fn write_then_parse_round_trips(records in prop::collection::vec(record(), 0..4)) {
      let written = write_descriptors(&records);
      let parsed = parse_descriptors(&written).unwrap();
      prop_assert_eq!(&parsed, &records);
      for (a, b) in parsed.iter().zip(&records) {
        prop_assert!(a.attrs.keys().eq(b.attrs.keys()));
      }
    }
  }
}
