use super::source::{FieldSource, FieldValue};

/// Typed extraction of a [`FieldValue`]. A shape mismatch yields `None`.
pub trait FromField: Sized {
    fn from_field(value: &FieldValue) -> Option<Self>;
}

impl FromField for f64 {
    fn from_field(value: &FieldValue) -> Option<Self> {
        value.as_number()
    }
}

impl FromField for i64 {
    fn from_field(value: &FieldValue) -> Option<Self> {
        value
            .as_number()
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
    }
}

impl FromField for usize {
    fn from_field(value: &FieldValue) -> Option<Self> {
        value
            .as_number()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as usize)
    }
}

impl FromField for bool {
    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Number(v) => Some(*v != 0.0),
            _ => None,
        }
    }
}

impl FromField for String {
    fn from_field(value: &FieldValue) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}

/// Resolves named fields to typed values, falling back to a caller default.
///
/// Never fails: a missing field, a field of the wrong shape or an index
/// outside an array all resolve to the default. NaN and infinities are
/// returned as-is; cleaning happens when the snapshot is encoded.
pub struct FieldAccessor<'a> {
    source: &'a dyn FieldSource,
}

impl<'a> FieldAccessor<'a> {
    pub fn new(source: &'a dyn FieldSource) -> Self {
        Self { source }
    }

    pub fn get<T: FromField>(&self, name: &str, default: T) -> T {
        self.source
            .field(name)
            .and_then(T::from_field)
            .unwrap_or(default)
    }

    pub fn array(&self, name: &str) -> Option<&'a [f64]> {
        self.source.field(name).and_then(FieldValue::as_array)
    }

    /// Element `index` of an array field, if the array exists and is long enough.
    pub fn element(&self, name: &str, index: usize) -> Option<f64> {
        self.array(name).and_then(|values| values.get(index).copied())
    }

    pub fn element_or(&self, name: &str, index: usize, default: f64) -> f64 {
        self.element(name, index).unwrap_or(default)
    }

    pub fn has_index(&self, name: &str, index: usize) -> bool {
        self.array(name).map_or(false, |values| index < values.len())
    }

    /// Sorted list of every field the source currently publishes.
    pub fn list_available(&self) -> Vec<String> {
        let mut names = self.source.field_names();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::collections::HashMap;

    struct MapSource {
        fields: HashMap<String, FieldValue>,
    }

    impl MapSource {
        fn new(pairs: Vec<(&str, FieldValue)>) -> Self {
            Self {
                fields: pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            }
        }
    }

    impl FieldSource for MapSource {
        fn describe(&self) -> String {
            "map".to_string()
        }
        fn connect(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn advance(&mut self) {}
        fn field(&self, name: &str) -> Option<&FieldValue> {
            self.fields.get(name)
        }
        fn field_names(&self) -> Vec<String> {
            self.fields.keys().cloned().collect()
        }
        fn shutdown(&mut self) {}
    }

    #[test]
    fn test_missing_field_uses_default() {
        let source = MapSource::new(vec![]);
        let fields = FieldAccessor::new(&source);
        assert_eq!(fields.get("TrackLength", 4000.0), 4000.0);
        assert_eq!(fields.get("PlayerCarIdx", 0usize), 0);
        assert_eq!(fields.get("CarClass", "Unknown".to_string()), "Unknown");
        assert!(fields.element("CarIdxPosX", 3).is_none());
    }

    #[test]
    fn test_wrong_shape_uses_default() {
        let source = MapSource::new(vec![
            ("TrackLength", FieldValue::Array(vec![1.0, 2.0])),
            ("CarIdxPosX", FieldValue::Number(12.0)),
            ("CarClass", FieldValue::Number(3.0)),
        ]);
        let fields = FieldAccessor::new(&source);
        assert_eq!(fields.get("TrackLength", 4000.0), 4000.0);
        assert!(fields.element("CarIdxPosX", 0).is_none());
        assert!(!fields.has_index("CarIdxPosX", 0));
        assert_eq!(fields.get("CarClass", "Unknown".to_string()), "Unknown");
    }

    #[test]
    fn test_non_finite_values_propagate() {
        let source = MapSource::new(vec![
            ("Yaw", FieldValue::Number(f64::NAN)),
            ("CarIdxSpeed", FieldValue::Array(vec![1.0, f64::INFINITY])),
        ]);
        let fields = FieldAccessor::new(&source);
        assert!(fields.get("Yaw", 0.0).is_nan());
        assert_eq!(fields.element("CarIdxSpeed", 1), Some(f64::INFINITY));
    }

    #[test]
    fn test_index_out_of_range() {
        let source = MapSource::new(vec![("CarIdxLapDistPct", FieldValue::Array(vec![0.1, 0.2]))]);
        let fields = FieldAccessor::new(&source);
        assert!(fields.has_index("CarIdxLapDistPct", 1));
        assert!(!fields.has_index("CarIdxLapDistPct", 2));
        assert_eq!(fields.element_or("CarIdxLapDistPct", 5, -1.0), -1.0);
    }

    #[test]
    fn test_integer_conversions() {
        let source = MapSource::new(vec![
            ("PlayerCarIdx", FieldValue::Number(4.0)),
            ("CarIdxCount", FieldValue::Number(-2.0)),
            ("IsOnTrack", FieldValue::Bool(true)),
        ]);
        let fields = FieldAccessor::new(&source);
        assert_eq!(fields.get("PlayerCarIdx", 0usize), 4);
        assert_eq!(fields.get("CarIdxCount", 64usize), 64);
        assert_eq!(fields.get("CarIdxCount", 0i64), -2);
        assert!(fields.get("IsOnTrack", false));
    }

    #[test]
    fn test_list_available_sorted() {
        let source = MapSource::new(vec![
            ("Yaw", FieldValue::Number(0.0)),
            ("CarIdxPosX", FieldValue::Array(vec![])),
        ]);
        let fields = FieldAccessor::new(&source);
        assert_eq!(fields.list_available(), vec!["CarIdxPosX", "Yaw"]);
    }
}
