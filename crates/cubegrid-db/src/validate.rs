//! Structural validation of entity documents.
//!
//! Validation runs on the JSON document form of an entity, before any
//! write is attempted. It checks shapes, types, and ranges, and fills in
//! derived fields: `proximityPadding` is always rewritten as `|weight|`.
//! The `originID` consistency check is separate
//! ([`check_origin`]) because it is a cross-field invariant, not a shape.

use cubegrid_types::EntityKind;
use serde_json::{Map, Value};

use crate::error::{StoreError, ValidationError, ValidationReason};

/// Inclusive bounds of a stored color channel.
const CHANNEL_RANGE: (f64, f64) = (0.0, 255.0);

/// Validate `document` as a `kind` entity, setting derived fields in place.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_document(kind: EntityKind, document: &mut Value) -> Result<(), ValidationError> {
    let v = Validator { kind };
    let Some(fields) = document.as_object_mut() else {
        return Err(v.error("$", ValidationReason::WrongType { expected: "object" }));
    };
    v.key(fields, kind.key_field())?;

    match kind {
        EntityKind::CubeVertex => {
            v.key(fields, "windowUID")?;
            v.optional_key(fields, "activeWindowUID")?;
            let weight = v.vertex_value(fields, "valueArray")?;
            v.string(fields, "blendingLogicId")?;
            fields.insert("proximityPadding".to_owned(), Value::from(weight.abs()));
        }
        EntityKind::Cube => {
            v.key(fields, "windowUID")?;
            v.optional_key(fields, "activeWindowUID")?;
            v.point(v.required(fields, "position")?, "position")?;
            v.key_list(fields, "subcubeIDs")?;
            v.packed_vertices(fields, "vertices")?;
            v.string(fields, "blendingLogicId")?;
        }
        EntityKind::Subcube => {
            v.key(fields, "windowUID")?;
            v.optional_key(fields, "activeWindowUID")?;
            v.point(v.required(fields, "center")?, "center")?;
            v.integer(fields, "order")?;
            v.vertex_refs(fields, "vertexArray")?;
            v.key(fields, "cubeId")?;
            v.string(fields, "originID")?;
            v.string(fields, "blendingLogicId")?;
        }
        EntityKind::SubcubeVertex => {
            v.key(fields, "windowUID")?;
            v.key(fields, "cubeId")?;
            v.key(fields, "subCubeID")?;
            v.string(fields, "originID")?;
            v.optional_key(fields, "activeWindowUID")?;
            let weight = v.vertex_value(fields, "value")?;
            fields.insert("proximityPadding".to_owned(), Value::from(weight.abs()));
        }
        EntityKind::CubeMatrix => v.matrix(fields)?,
        EntityKind::SubcubeMatrix => {
            v.matrix(fields)?;
            v.key(fields, "cubeId")?;
        }
        EntityKind::BackgroundMatrix => {
            v.matrix(fields)?;
            v.point(v.required(fields, "ambientValue")?, "ambientValue")?;
            v.string(fields, "blendingLogicId")?;
        }
        EntityKind::BlendingLogic => {
            v.string(fields, "strategy")?;
        }
        EntityKind::ZAxisConfig => {
            v.point(v.required(fields, "cameraPosition")?, "cameraPosition")?;
            v.point(v.required(fields, "userDefinedPoint")?, "userDefinedPoint")?;
        }
    }
    Ok(())
}

/// Check that a subcube or subcube vertex has
/// `originID == windowUID ‖ cubeId`. Other kinds always pass.
///
/// Expects a document that already passed [`validate_document`].
///
/// # Errors
///
/// Returns [`StoreError::Consistency`] on mismatch.
pub fn check_origin(kind: EntityKind, document: &Value) -> Result<(), StoreError> {
    if !kind.has_origin() {
        return Ok(());
    }
    let part = |field: &str| document.get(field).and_then(key_string).unwrap_or_default();
    let expected = format!("{}{}", part("windowUID"), part("cubeId"));
    let actual = document
        .get("originID")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if actual == expected {
        Ok(())
    } else {
        Err(StoreError::Consistency {
            kind,
            expected,
            actual: actual.to_owned(),
        })
    }
}

/// The primary key of a validated `kind` document.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the key field is missing or not a key.
pub fn document_key(kind: EntityKind, document: &Value) -> Result<String, ValidationError> {
    let field = kind.key_field();
    let value = document
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ValidationError::new(kind, field, ValidationReason::Missing))?;
    key_string(value).ok_or_else(|| {
        ValidationError::new(
            kind,
            field,
            ValidationReason::WrongType { expected: "string or integer" },
        )
    })
}

/// Canonical string form of a key value (a string or an integer).
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

struct Validator {
    kind: EntityKind,
}

impl Validator {
    fn error(&self, field: impl Into<String>, reason: ValidationReason) -> ValidationError {
        ValidationError::new(self.kind, field, reason)
    }

    fn required<'a>(
        &self,
        fields: &'a Map<String, Value>,
        name: &str,
    ) -> Result<&'a Value, ValidationError> {
        fields
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| self.error(name, ValidationReason::Missing))
    }

    fn key(&self, fields: &Map<String, Value>, name: &str) -> Result<(), ValidationError> {
        self.key_value(self.required(fields, name)?, name)
    }

    fn key_value(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        key_string(value)
            .map(|_| ())
            .ok_or_else(|| {
                self.error(path, ValidationReason::WrongType { expected: "string or integer" })
            })
    }

    fn optional_key(&self, fields: &Map<String, Value>, name: &str) -> Result<(), ValidationError> {
        match fields.get(name) {
            None | Some(Value::Null) => Ok(()),
            Some(value) => self.key_value(value, name),
        }
    }

    fn string(&self, fields: &Map<String, Value>, name: &str) -> Result<(), ValidationError> {
        self.string_value(self.required(fields, name)?, name)
    }

    fn string_value(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        if value.is_string() {
            Ok(())
        } else {
            Err(self.error(path, ValidationReason::WrongType { expected: "string" }))
        }
    }

    fn integer(&self, fields: &Map<String, Value>, name: &str) -> Result<(), ValidationError> {
        let value = self.required(fields, name)?;
        if value.is_i64() || value.is_u64() {
            Ok(())
        } else {
            Err(self.error(name, ValidationReason::WrongType { expected: "integer" }))
        }
    }

    fn number(&self, value: &Value, path: &str) -> Result<f64, ValidationError> {
        value
            .as_f64()
            .ok_or_else(|| self.error(path, ValidationReason::WrongType { expected: "number" }))
    }

    fn array<'a>(&self, value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ValidationError> {
        value
            .as_array()
            .ok_or_else(|| self.error(path, ValidationReason::WrongType { expected: "array" }))
    }

    fn tuple<'a>(
        &self,
        value: &'a Value,
        path: &str,
        len: usize,
    ) -> Result<&'a Vec<Value>, ValidationError> {
        let items = self.array(value, path)?;
        if items.len() == len {
            Ok(items)
        } else {
            Err(self.error(
                path,
                ValidationReason::WrongShape {
                    expected: len,
                    actual: items.len(),
                },
            ))
        }
    }

    fn point(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        for (i, item) in self.tuple(value, path, 3)?.iter().enumerate() {
            self.number(item, &format!("{path}[{i}]"))?;
        }
        Ok(())
    }

    fn color(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        let (min, max) = CHANNEL_RANGE;
        for (i, item) in self.tuple(value, path, 3)?.iter().enumerate() {
            let channel_path = format!("{path}[{i}]");
            let channel = self.number(item, &channel_path)?;
            if !(min..=max).contains(&channel) {
                return Err(self.error(
                    channel_path,
                    ValidationReason::OutOfRange {
                        value: channel,
                        min,
                        max,
                    },
                ));
            }
        }
        Ok(())
    }

    /// `[color, position, weight, proximityStrategyId]`; returns the weight.
    fn vertex_value(
        &self,
        fields: &Map<String, Value>,
        name: &str,
    ) -> Result<f64, ValidationError> {
        let items = self.tuple(self.required(fields, name)?, name, 4)?;
        let [color, position, weight, proximity] = items.as_slice() else {
            return Err(self.error(
                name,
                ValidationReason::WrongShape {
                    expected: 4,
                    actual: items.len(),
                },
            ));
        };
        self.color(color, &format!("{name}[0]"))?;
        self.point(position, &format!("{name}[1]"))?;
        let weight = self.number(weight, &format!("{name}[2]"))?;
        self.string_value(proximity, &format!("{name}[3]"))?;
        Ok(weight)
    }

    fn key_list(&self, fields: &Map<String, Value>, name: &str) -> Result<(), ValidationError> {
        for (i, item) in self.array(self.required(fields, name)?, name)?.iter().enumerate() {
            self.key_value(item, &format!("{name}[{i}]"))?;
        }
        Ok(())
    }

    /// `[[position, color], ...]`.
    fn packed_vertices(
        &self,
        fields: &Map<String, Value>,
        name: &str,
    ) -> Result<(), ValidationError> {
        for (i, item) in self.array(self.required(fields, name)?, name)?.iter().enumerate() {
            let path = format!("{name}[{i}]");
            if let [position, color] = self.tuple(item, &path, 2)?.as_slice() {
                self.point(position, &format!("{path}[0]"))?;
                self.color(color, &format!("{path}[1]"))?;
            }
        }
        Ok(())
    }

    /// `[[vertexID, blendingLogicId], ...]`.
    fn vertex_refs(&self, fields: &Map<String, Value>, name: &str) -> Result<(), ValidationError> {
        for (i, item) in self.array(self.required(fields, name)?, name)?.iter().enumerate() {
            let path = format!("{name}[{i}]");
            if let [vertex_id, logic_id] = self.tuple(item, &path, 2)?.as_slice() {
                self.key_value(vertex_id, &format!("{path}[0]"))?;
                self.string_value(logic_id, &format!("{path}[1]"))?;
            }
        }
        Ok(())
    }

    fn matrix(&self, fields: &Map<String, Value>) -> Result<(), ValidationError> {
        self.key(fields, "windowUID")?;
        for layer in ["redLayer", "greenLayer", "blueLayer"] {
            for (i, item) in self.array(self.required(fields, layer)?, layer)?.iter().enumerate() {
                self.number(item, &format!("{layer}[{i}]"))?;
            }
        }
        self.array(self.required(fields, "binData")?, "binData")?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subcube_vertex() -> Value {
        json!({
            "id": "v1",
            "windowUID": "1",
            "cubeId": "1",
            "subCubeID": "s1",
            "originID": "11",
            "value": [[255, 0, 0], [1.0, 2.0, 3.0], -4.5, "BlendCornerByProximity"],
            "activeWindowUID": null
        })
    }

    fn reason(result: Result<(), ValidationError>) -> Option<(String, ValidationReason)> {
        result.err().map(|e| (e.field, e.reason))
    }

    #[test]
    fn derives_proximity_padding_from_weight() {
        let mut doc = subcube_vertex();
        doc["proximityPadding"] = json!(999);
        assert!(validate_document(EntityKind::SubcubeVertex, &mut doc).is_ok());
        assert_eq!(doc["proximityPadding"], json!(4.5));
    }

    #[test]
    fn vertex_value_must_be_a_four_tuple() {
        let mut doc = subcube_vertex();
        doc["value"] = json!([[0, 0, 0], [0, 0, 0], 1.0]);
        assert_eq!(
            reason(validate_document(EntityKind::SubcubeVertex, &mut doc)),
            Some((
                "value".to_owned(),
                ValidationReason::WrongShape {
                    expected: 4,
                    actual: 3
                }
            ))
        );
    }

    #[test]
    fn color_channels_are_range_checked() {
        let mut doc = subcube_vertex();
        doc["value"][0] = json!([0, 256, 0]);
        assert_eq!(
            reason(validate_document(EntityKind::SubcubeVertex, &mut doc)),
            Some((
                "value[0][1]".to_owned(),
                ValidationReason::OutOfRange {
                    value: 256.0,
                    min: 0.0,
                    max: 255.0
                }
            ))
        );
    }

    #[test]
    fn weight_must_be_numeric_and_proximity_a_string() {
        let mut doc = subcube_vertex();
        doc["value"][2] = json!("heavy");
        assert_eq!(
            reason(validate_document(EntityKind::SubcubeVertex, &mut doc)),
            Some(("value[2]".to_owned(), ValidationReason::WrongType { expected: "number" }))
        );

        let mut doc = subcube_vertex();
        doc["value"][3] = json!(7);
        assert_eq!(
            reason(validate_document(EntityKind::SubcubeVertex, &mut doc)),
            Some(("value[3]".to_owned(), ValidationReason::WrongType { expected: "string" }))
        );
    }

    #[test]
    fn subcube_vertex_array_entries_are_pairs() {
        let mut doc = json!({
            "id": "s1",
            "windowUID": "1",
            "center": [0, 0, 0],
            "order": 2,
            "vertexArray": [["v1", "BlendVrtxByWeight"], ["v2", "blendBackground", "extra"]],
            "cubeId": "1",
            "originID": "11",
            "blendingLogicId": "blendBackground"
        });
        assert_eq!(
            reason(validate_document(EntityKind::Subcube, &mut doc)),
            Some((
                "vertexArray[1]".to_owned(),
                ValidationReason::WrongShape {
                    expected: 2,
                    actual: 3
                }
            ))
        );
    }

    #[test]
    fn subcube_order_must_be_an_integer() {
        let mut doc = json!({
            "id": "s1", "windowUID": "1", "center": [0, 0, 0], "order": 1.5,
            "vertexArray": [], "cubeId": "1", "originID": "11", "blendingLogicId": "x"
        });
        assert_eq!(
            reason(validate_document(EntityKind::Subcube, &mut doc)),
            Some(("order".to_owned(), ValidationReason::WrongType { expected: "integer" }))
        );
    }

    #[test]
    fn matrices_require_layers_and_bin_data() {
        let mut doc = json!({
            "id": "m1", "windowUID": "1",
            "redLayer": [1, 2], "greenLayer": [3], "blueLayer": []
        });
        assert_eq!(
            reason(validate_document(EntityKind::CubeMatrix, &mut doc)),
            Some(("binData".to_owned(), ValidationReason::Missing))
        );

        doc["binData"] = json!({ "row": 1 });
        assert_eq!(
            reason(validate_document(EntityKind::CubeMatrix, &mut doc)),
            Some(("binData".to_owned(), ValidationReason::WrongType { expected: "array" }))
        );

        // Layer lengths are not cross-checked against binData.
        doc["binData"] = json!([{ "row": 0, "col": 0, "depth": 0, "value": 1 }, "anything"]);
        assert!(validate_document(EntityKind::CubeMatrix, &mut doc).is_ok());

        doc["greenLayer"] = json!("green");
        assert_eq!(
            reason(validate_document(EntityKind::CubeMatrix, &mut doc)),
            Some(("greenLayer".to_owned(), ValidationReason::WrongType { expected: "array" }))
        );
    }

    #[test]
    fn non_objects_are_rejected() {
        let mut doc = json!([1, 2, 3]);
        assert_eq!(
            reason(validate_document(EntityKind::Cube, &mut doc)),
            Some(("$".to_owned(), ValidationReason::WrongType { expected: "object" }))
        );
    }

    #[test]
    fn origin_must_concatenate_window_and_cube() {
        let doc = subcube_vertex();
        assert!(check_origin(EntityKind::SubcubeVertex, &doc).is_ok());

        let mut numeric = subcube_vertex();
        numeric["windowUID"] = json!(1);
        numeric["cubeId"] = json!(1);
        assert!(check_origin(EntityKind::SubcubeVertex, &numeric).is_ok());

        let mut wrong = subcube_vertex();
        wrong["originID"] = json!("1-1");
        assert!(matches!(
            check_origin(EntityKind::SubcubeVertex, &wrong),
            Err(StoreError::Consistency { expected, actual, .. })
                if expected == "11" && actual == "1-1"
        ));

        // Kinds without an origin are never checked.
        assert!(check_origin(EntityKind::Cube, &wrong).is_ok());
    }

    #[test]
    fn keys_accept_strings_and_integers() {
        assert_eq!(key_string(&json!("abc")), Some("abc".to_owned()));
        assert_eq!(key_string(&json!(12)), Some("12".to_owned()));
        assert_eq!(key_string(&json!(1.5)), None);
        assert_eq!(
            document_key(EntityKind::CubeVertex, &json!({ "vertexID": 3 })).ok(),
            Some("3".to_owned())
        );
        assert!(document_key(EntityKind::CubeVertex, &json!({ "id": 3 })).is_err());
    }
}
