use crate::table::{Field, KeyValue};

/// A row addressable by key fields and named numeric metrics.
///
/// Every table transform (group-reduce, rank, join, regression) is written
/// against this trait rather than a concrete row type.
pub trait Record {
    /// Resolves a key field, or `None` if this row type does not carry it.
    fn key(&self, field: Field) -> Option<KeyValue>;

    /// Returns a numeric metric. `None` means the value is missing for this
    /// row, or the metric is not defined for this row type.
    fn metric(&self, name: &str) -> Option<f64>;

    /// Returns true if `name` is a metric column of this row type.
    fn has_metric(&self, name: &str) -> bool;

    /// Resolves an ordered key tuple; `None` if any field is unavailable.
    fn key_tuple(&self, fields: &[Field]) -> Option<Vec<KeyValue>> {
        fields.iter().map(|f| self.key(*f)).collect()
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn key(&self, field: Field) -> Option<KeyValue> {
        (**self).key(field)
    }

    fn metric(&self, name: &str) -> Option<f64> {
        (**self).metric(name)
    }

    fn has_metric(&self, name: &str) -> bool {
        (**self).has_metric(name)
    }
}
