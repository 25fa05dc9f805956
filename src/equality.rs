//! Order-independent structural comparison of records.
//!
//! Two records are equal when they hold the same multiset of control fields,
//! the same multiset of data fields, and each matching pair of data fields
//! holds the same multiset of subfields. Field and subfield order, which
//! differs freely between serializations, is ignored.
//!
//! The leader is compared only on request: Line-MARC input may lack one and
//! get a synthesized leader, which carries no meaning across formats.

use crate::record::{ControlField, DataField, Record, Subfield};

/// Compare two records as multisets of fields.
///
/// Control fields are ordered by `(tag, value)`, data fields by
/// `(tag, indicator1, indicator2)` and subfields by `(code, value)` before an
/// element-wise comparison. Neither record is modified.
///
/// ```
/// use marc_codec::{equality, ControlField, Record};
///
/// # fn main() -> marc_codec::Result<()> {
/// let a = Record::builder()
///     .control_field(ControlField::new("001", "1")?)
///     .control_field(ControlField::new("008", "x")?)
///     .build();
/// let b = Record::builder()
///     .control_field(ControlField::new("008", "x")?)
///     .control_field(ControlField::new("001", "1")?)
///     .build();
/// assert!(equality::equals(&a, &b, false));
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn equals(a: &Record, b: &Record, include_leader: bool) -> bool {
    if include_leader && a.leader() != b.leader() {
        return false;
    }
    control_fields_equal(a.control_fields(), b.control_fields())
        && data_fields_equal(a.data_fields(), b.data_fields())
}

fn control_fields_equal(a: &[ControlField], b: &[ControlField]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    // ControlField orders by (tag, value)
    sorted(a) == sorted(b)
}

fn data_fields_equal(a: &[DataField], b: &[DataField]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    normalized(a) == normalized(b)
}

/// A data field reduced to its comparison key, subfields in (code, value) order.
type FieldKey<'a> = (&'a str, char, char, Vec<&'a Subfield>);

fn normalized(fields: &[DataField]) -> Vec<FieldKey<'_>> {
    let mut keys: Vec<FieldKey<'_>> = fields
        .iter()
        .map(|f| {
            (
                f.tag(),
                f.indicator1(),
                f.indicator2(),
                sorted(f.subfields()),
            )
        })
        .collect();
    // Ties on (tag, ind1, ind2) fall back to the sorted subfields, so
    // repeated fields pair up regardless of source order.
    keys.sort();
    keys
}

fn sorted<T: Ord>(items: &[T]) -> Vec<&T> {
    let mut refs: Vec<&T> = items.iter().collect();
    refs.sort();
    refs
}
