//! Geometries paired with scalar properties.
//!
//! [`ShapeWithProps`] is the unit of detection output: created by the
//! inference stage, extended by post-processing, consumed by the writers.
//! It is treated as an immutable value; every transformation returns a new
//! shape.

use std::collections::BTreeMap;

use geo::{Area, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// Property key holding the classifier probability of a detection.
pub const PROB: &str = "prob";
/// Property key holding the neighbourhood-smoothed probability.
pub const PROB_MEAN: &str = "prob_mean";

/// A scalar property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl PropValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Number(v)
    }
}

impl From<f32> for PropValue {
    fn from(v: f32) -> Self {
        PropValue::Number(v as f64)
    }
}

impl From<usize> for PropValue {
    fn from(v: usize) -> Self {
        PropValue::Number(v as f64)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Text(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Text(v)
    }
}

/// Order-irrelevant mapping of property names to scalar values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropValue::as_f64)
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, PropValue)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, PropValue)>>(iter: I) -> Self {
        Props(iter.into_iter().collect())
    }
}

/// A geometry paired with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeWithProps {
    pub geometry: MultiPolygon<f64>,
    pub props: Props,
}

impl ShapeWithProps {
    pub fn new(geometry: MultiPolygon<f64>, props: Props) -> Self {
        Self { geometry, props }
    }

    /// A shape carrying only a `prob` property.
    pub fn with_prob(geometry: MultiPolygon<f64>, prob: f64) -> Self {
        Self::new(geometry, Props::new().with(PROB, prob))
    }

    /// The `prob` property, if present and numeric.
    pub fn prob(&self) -> Option<f64> {
        self.props.get_f64(PROB)
    }

    /// Return a copy with one property replaced or added.
    pub fn with_prop(&self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        Self::new(self.geometry.clone(), self.props.clone().with(key, value))
    }

    /// Return a copy with a different geometry and the same properties.
    pub fn with_geometry(&self, geometry: MultiPolygon<f64>) -> Self {
        Self::new(geometry, self.props.clone())
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::of_multi_polygon(&self.geometry)
    }

    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_prop_does_not_mutate_original() {
        let original =
            ShapeWithProps::with_prob(BoundingBox::new(0.0, 0.0, 1.0, 1.0).to_multi_polygon(), 0.4);
        let smoothed = original.with_prop(PROB_MEAN, 0.6);

        assert_eq!(original.props.len(), 1);
        assert_eq!(smoothed.props.get_f64(PROB_MEAN), Some(0.6));
        assert_eq!(smoothed.prob(), Some(0.4));
    }

    #[test]
    fn test_props_json_shape() {
        let props = Props::new().with(PROB, 0.5).with("name", "block 7").with("valid", true);
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json["prob"], 0.5);
        assert_eq!(json["name"], "block 7");
        assert_eq!(json["valid"], true);

        let back: Props = serde_json::from_value(json).unwrap();
        assert_eq!(back, props);
    }

    #[test]
    fn test_area_and_bbox() {
        let shape =
            ShapeWithProps::with_prob(BoundingBox::new(0.0, 0.0, 2.0, 3.0).to_multi_polygon(), 1.0);
        assert!((shape.area() - 6.0).abs() < 1e-12);
        assert_eq!(shape.bounding_box(), Some(BoundingBox::new(0.0, 0.0, 2.0, 3.0)));
    }
}
