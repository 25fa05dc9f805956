//! MARC record structures.
//!
//! This module provides the record types shared by every codec:
//! - [`Record`]: A leader plus ordered control and data fields
//! - [`ControlField`]: Fields whose tag begins with `00`
//! - [`DataField`]: Fields with two indicators and subfields
//! - [`Subfield`]: Code/value pairs within a data field
//!
//! Construction goes through validating constructors so a tag is always three
//! characters and sits on the correct side of the control/data split.
//!
//! # Examples
//!
//! ```
//! use marc_codec::{ControlField, DataField, Record};
//!
//! # fn main() -> marc_codec::Result<()> {
//! let record = Record::builder()
//!     .control_field(ControlField::new("001", "12345")?)
//!     .data_field(
//!         DataField::new("245", '1', '0')?
//!             .with_subfield('a', "Title")
//!             .with_subfield('c', "Author"),
//!     )
//!     .build();
//!
//! assert_eq!(record.control_field("001").map(ControlField::value), Some("12345"));
//! assert_eq!(record.data_fields_by_tag("245").next().and_then(|f| f.subfield('a')), Some("Title"));
//! # Ok(())
//! # }
//! ```

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Number of characters in a MARC tag.
pub const TAG_LEN: usize = 3;

/// Indicator value used when a source format leaves an indicator out.
pub const BLANK_INDICATOR: char = ' ';

/// A MARC bibliographic record.
///
/// Control fields and data fields each keep the order in which they were
/// added, which is the order every encoder writes them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    leader: Option<Leader>,
    control_fields: Vec<ControlField>,
    data_fields: Vec<DataField>,
}

/// A control field (tag `000`-`009`, or any tag starting with `00`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawControlField")]
pub struct ControlField {
    tag: String,
    value: String,
}

/// A data field: tag, two indicators and ordered subfields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDataField")]
pub struct DataField {
    tag: String,
    indicator1: char,
    indicator2: char,
    /// Stored inline for the common case of four or fewer subfields
    subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a data field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

// Deserialized fields go through the same constructors as everything else.
#[derive(Deserialize)]
struct RawControlField {
    tag: String,
    value: String,
}

impl TryFrom<RawControlField> for ControlField {
    type Error = MarcError;

    fn try_from(raw: RawControlField) -> Result<Self> {
        ControlField::new(raw.tag, raw.value)
    }
}

#[derive(Deserialize)]
struct RawDataField {
    tag: String,
    indicator1: char,
    indicator2: char,
    subfields: SmallVec<[Subfield; 4]>,
}

impl TryFrom<RawDataField> for DataField {
    type Error = MarcError;

    fn try_from(raw: RawDataField) -> Result<Self> {
        let mut field = DataField::new(raw.tag, raw.indicator1, raw.indicator2)?;
        field.subfields = raw.subfields;
        Ok(field)
    }
}

fn check_tag(tag: &str) -> Result<()> {
    if tag.chars().count() == TAG_LEN {
        Ok(())
    } else {
        Err(MarcError::InvalidField(format!(
            "tag must be {TAG_LEN} characters: {tag:?}"
        )))
    }
}

/// Whether `tag` names a control field.
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag.starts_with("00")
}

/// First character of `text`, or a blank when `text` is empty.
///
/// Source formats that carry indicators as strings (XML attributes, line-mode
/// tag suffixes) may leave them empty; the record model always stores one
/// character.
#[must_use]
pub fn indicator_from_str(text: &str) -> char {
    text.chars().next().unwrap_or(BLANK_INDICATOR)
}

impl Record {
    /// Create an empty record with no leader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record with the given leader.
    #[must_use]
    pub fn with_leader(leader: Leader) -> Self {
        Record {
            leader: Some(leader),
            ..Self::default()
        }
    }

    /// Create a builder for fluently constructing records.
    #[must_use]
    pub fn builder() -> RecordBuilder {
        RecordBuilder {
            record: Record::new(),
        }
    }

    /// The leader, if the source format supplied or synthesized one.
    #[must_use]
    pub fn leader(&self) -> Option<&Leader> {
        self.leader.as_ref()
    }

    /// Replace the leader.
    pub fn set_leader(&mut self, leader: Leader) {
        self.leader = Some(leader);
    }

    /// Remove the leader.
    pub fn clear_leader(&mut self) {
        self.leader = None;
    }

    /// Control fields in insertion order.
    #[must_use]
    pub fn control_fields(&self) -> &[ControlField] {
        &self.control_fields
    }

    /// Data fields in insertion order.
    #[must_use]
    pub fn data_fields(&self) -> &[DataField] {
        &self.data_fields
    }

    /// True when the record has no leader and no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leader.is_none() && self.control_fields.is_empty() && self.data_fields.is_empty()
    }

    /// Append a control field.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidField`] if `tag` is not three characters
    /// starting with `00`.
    pub fn add_control_field(&mut self, tag: &str, value: impl Into<String>) -> Result<()> {
        self.control_fields.push(ControlField::new(tag, value)?);
        Ok(())
    }

    /// Replace the value of the first control field with `tag`, or append one.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidField`] if `tag` is not a control tag.
    pub fn set_control_field(&mut self, tag: &str, value: impl Into<String>) -> Result<()> {
        let field = ControlField::new(tag, value)?;
        match self.control_fields.iter_mut().find(|f| f.tag == field.tag) {
            Some(existing) => existing.value = field.value,
            None => self.control_fields.push(field),
        }
        Ok(())
    }

    /// Append a data field.
    pub fn add_data_field(&mut self, field: DataField) {
        self.data_fields.push(field);
    }

    /// First control field with the given tag.
    #[must_use]
    pub fn control_field(&self, tag: &str) -> Option<&ControlField> {
        self.control_fields.iter().find(|f| f.tag == tag)
    }

    /// Iterate over data fields with the given tag.
    ///
    /// ```
    /// use marc_codec::{DataField, Record};
    ///
    /// # fn main() -> marc_codec::Result<()> {
    /// let mut record = Record::new();
    /// record.add_data_field(DataField::new("020", ' ', ' ')?.with_subfield('a', "978-82-999778-1-4"));
    /// record.add_data_field(DataField::new("020", ' ', ' ')?.with_subfield('a', "978-82-999778-1-5"));
    ///
    /// let isbns: Vec<_> = record.data_fields_by_tag("020").filter_map(|f| f.subfield('a')).collect();
    /// assert_eq!(isbns, ["978-82-999778-1-4", "978-82-999778-1-5"]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn data_fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> {
        self.data_fields.iter().filter(move |f| f.tag == tag)
    }

    /// Structural equality ignoring the leader and field order.
    ///
    /// See [`crate::equality::equals`].
    #[must_use]
    pub fn equals_ignoring_leader(&self, other: &Record) -> bool {
        crate::equality::equals(self, other, false)
    }

    /// Structural equality including the leader, ignoring field order.
    ///
    /// See [`crate::equality::equals`].
    #[must_use]
    pub fn equals_including_leader(&self, other: &Record) -> bool {
        crate::equality::equals(self, other, true)
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Set the leader.
    #[must_use]
    pub fn leader(mut self, leader: Leader) -> Self {
        self.record.leader = Some(leader);
        self
    }

    /// Append a control field.
    #[must_use]
    pub fn control_field(mut self, field: ControlField) -> Self {
        self.record.control_fields.push(field);
        self
    }

    /// Append a data field.
    #[must_use]
    pub fn data_field(mut self, field: DataField) -> Self {
        self.record.data_fields.push(field);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

impl ControlField {
    /// Create a control field.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidField`] if `tag` is not three characters
    /// starting with `00`.
    ///
    /// ```
    /// use marc_codec::ControlField;
    ///
    /// assert!(ControlField::new("008", "871001").is_ok());
    /// assert!(ControlField::new("245", "Title").is_err());
    /// ```
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        check_tag(&tag)?;
        if !is_control_tag(&tag) {
            return Err(MarcError::InvalidField(format!(
                "control field tag must start with 00: {tag:?}"
            )));
        }
        Ok(ControlField {
            tag,
            value: value.into(),
        })
    }

    /// Field tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Field value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

impl DataField {
    /// Create a data field with no subfields.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidField`] if `tag` is not three characters or
    /// starts with `00`.
    pub fn new(tag: impl Into<String>, indicator1: char, indicator2: char) -> Result<Self> {
        let tag = tag.into();
        check_tag(&tag)?;
        if is_control_tag(&tag) {
            return Err(MarcError::InvalidField(format!(
                "data field tag must not start with 00: {tag:?}"
            )));
        }
        Ok(DataField {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        })
    }

    /// Field tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// First indicator.
    #[must_use]
    pub fn indicator1(&self) -> char {
        self.indicator1
    }

    /// Second indicator.
    #[must_use]
    pub fn indicator2(&self) -> char {
        self.indicator2
    }

    /// Subfields in insertion order.
    #[must_use]
    pub fn subfields(&self) -> &[Subfield] {
        &self.subfields
    }

    /// Append a subfield.
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }

    /// Append a subfield, builder style.
    #[must_use]
    pub fn with_subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.add_subfield(code, value);
        self
    }

    /// Value of the first subfield with the given code.
    #[must_use]
    pub fn subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Values of every subfield with the given code.
    pub fn subfields_by_code(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }
}
