//! Property manifests and typed setter bindings.
//!
//! A view manager declares its stylable properties once, through the typed
//! methods on `PropertyManifest`. Each declaration records the property's
//! kind, its default (the non-styled baseline) and an erased setter. Grouped
//! declarations share one setter that also receives the member index.

use std::fmt;
use std::sync::Arc;

use trellis_api::{Map, Value};

use crate::element::Element;
use crate::error::UiError;

/// Argument type a setter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    Double,
    NullableDouble,
    Boolean,
    Int,
    String,
    NullableString,
    /// Packed ARGB, accepted as signed or unsigned 32-bit numbers.
    Color,
    Map,
}

impl PropKind {
    /// Type name exported to scripts.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropKind::Double | PropKind::NullableDouble => "number",
            PropKind::Boolean => "boolean",
            PropKind::Int => "int",
            PropKind::String | PropKind::NullableString => "string",
            PropKind::Color => "Color",
            PropKind::Map => "Map",
        }
    }

    /// Converts a raw value into this kind's argument.
    pub fn convert(&self, property: &str, raw: &Value) -> Result<PropArg, UiError> {
        let mismatch = |expected: &'static str| UiError::PropertyType {
            property: property.to_string(),
            expected,
            found: raw.type_name(),
        };
        match (self, raw) {
            (PropKind::Double, Value::Number(n)) => Ok(PropArg::Double(*n)),
            (PropKind::Double, _) => Err(mismatch("number")),

            (PropKind::NullableDouble, Value::Null) => Ok(PropArg::NullableDouble(None)),
            (PropKind::NullableDouble, Value::Number(n)) => Ok(PropArg::NullableDouble(Some(*n))),
            (PropKind::NullableDouble, _) => Err(mismatch("number or null")),

            (PropKind::Boolean, Value::Bool(b)) => Ok(PropArg::Boolean(*b)),
            (PropKind::Boolean, _) => Err(mismatch("boolean")),

            (PropKind::Int, value) => value
                .as_i64()
                .map(PropArg::Int)
                .ok_or_else(|| mismatch("integer")),

            (PropKind::String, Value::String(s)) => Ok(PropArg::String(s.clone())),
            (PropKind::String, _) => Err(mismatch("string")),

            (PropKind::NullableString, Value::Null) => Ok(PropArg::NullableString(None)),
            (PropKind::NullableString, Value::String(s)) => {
                Ok(PropArg::NullableString(Some(s.clone())))
            }
            (PropKind::NullableString, _) => Err(mismatch("string or null")),

            (PropKind::Color, Value::Null) => Ok(PropArg::Color(None)),
            (PropKind::Color, value) => value
                .as_i64()
                .filter(|n| (i32::MIN as i64..=u32::MAX as i64).contains(n))
                .map(|n| PropArg::Color(Some(n as u32)))
                .ok_or_else(|| mismatch("32-bit color")),

            (PropKind::Map, Value::Null) => Ok(PropArg::Map(None)),
            (PropKind::Map, Value::Map(m)) => Ok(PropArg::Map(Some(m.clone()))),
            (PropKind::Map, _) => Err(mismatch("map or null")),
        }
    }
}

/// A converted property value, shaped by its `PropKind`.
#[derive(Debug, Clone, PartialEq)]
pub enum PropArg {
    Double(f64),
    NullableDouble(Option<f64>),
    Boolean(bool),
    Int(i64),
    String(String),
    NullableString(Option<String>),
    Color(Option<u32>),
    Map(Option<Map>),
}

type Setter = Arc<dyn Fn(&mut Element, Option<usize>, PropArg) + Send + Sync>;

#[derive(Clone)]
pub struct PropertyBinding {
    pub name: String,
    pub kind: PropKind,
    pub default: Value,
    /// Member index when the binding belongs to a property group.
    pub group_index: Option<usize>,
    setter: Setter,
}

impl PropertyBinding {
    /// Converts `raw` (or the default when it is absent or null) and calls
    /// the setter.
    pub fn apply(&self, element: &mut Element, raw: Option<&Value>) -> Result<(), UiError> {
        let value = match raw {
            None | Some(Value::Null) => &self.default,
            Some(value) => value,
        };
        let arg = self.kind.convert(&self.name, value)?;
        (self.setter)(element, self.group_index, arg);
        Ok(())
    }
}

impl fmt::Debug for PropertyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinding")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("group_index", &self.group_index)
            .finish_non_exhaustive()
    }
}

/// Collects the bindings a view manager declares.
#[derive(Debug, Default)]
pub struct PropertyManifest {
    bindings: Vec<PropertyBinding>,
}

impl PropertyManifest {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        name: &str,
        kind: PropKind,
        default: Value,
        group_index: Option<usize>,
        setter: Setter,
    ) {
        self.bindings.push(PropertyBinding {
            name: name.to_string(),
            kind,
            default,
            group_index,
            setter,
        });
    }

    pub fn double<F>(&mut self, name: &str, default: f64, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, f64) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |element: &mut Element, _: Option<usize>, arg: PropArg| {
            if let PropArg::Double(v) = arg {
                setter(element, v)
            }
        });
        self.push(name, PropKind::Double, Value::Number(default), None, setter);
        self
    }

    pub fn nullable_double<F>(&mut self, name: &str, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, Option<f64>) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |element: &mut Element, _: Option<usize>, arg: PropArg| {
            if let PropArg::NullableDouble(v) = arg {
                setter(element, v)
            }
        });
        self.push(name, PropKind::NullableDouble, Value::Null, None, setter);
        self
    }

    pub fn boolean<F>(&mut self, name: &str, default: bool, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, bool) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |element: &mut Element, _: Option<usize>, arg: PropArg| {
            if let PropArg::Boolean(v) = arg {
                setter(element, v)
            }
        });
        self.push(name, PropKind::Boolean, Value::Bool(default), None, setter);
        self
    }

    pub fn int<F>(&mut self, name: &str, default: i64, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, i64) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |element: &mut Element, _: Option<usize>, arg: PropArg| {
            if let PropArg::Int(v) = arg {
                setter(element, v)
            }
        });
        self.push(name, PropKind::Int, Value::from(default), None, setter);
        self
    }

    pub fn string<F>(&mut self, name: &str, default: &str, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, String) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |element: &mut Element, _: Option<usize>, arg: PropArg| {
            if let PropArg::String(v) = arg {
                setter(element, v)
            }
        });
        self.push(name, PropKind::String, Value::from(default), None, setter);
        self
    }

    pub fn nullable_string<F>(&mut self, name: &str, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, Option<String>) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |element: &mut Element, _: Option<usize>, arg: PropArg| {
            if let PropArg::NullableString(v) = arg {
                setter(element, v)
            }
        });
        self.push(name, PropKind::NullableString, Value::Null, None, setter);
        self
    }

    pub fn color<F>(&mut self, name: &str, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, Option<u32>) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |element: &mut Element, _: Option<usize>, arg: PropArg| {
            if let PropArg::Color(v) = arg {
                setter(element, v)
            }
        });
        self.push(name, PropKind::Color, Value::Null, None, setter);
        self
    }

    pub fn map<F>(&mut self, name: &str, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, Option<&Map>) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |element: &mut Element, _: Option<usize>, arg: PropArg| {
            if let PropArg::Map(v) = arg {
                setter(element, v.as_ref())
            }
        });
        self.push(name, PropKind::Map, Value::Null, None, setter);
        self
    }

    /// Declares several names sharing one setter; the setter receives the
    /// position of the name that fired.
    pub fn group_nullable_double<F>(&mut self, names: &[&str], default: f64, setter: F) -> &mut Self
    where
        F: Fn(&mut Element, usize, Option<f64>) + Send + Sync + 'static,
    {
        let setter: Setter =
            Arc::new(move |element: &mut Element, index: Option<usize>, arg: PropArg| {
                if let PropArg::NullableDouble(v) = arg {
                    setter(element, index.unwrap_or(0), v)
                }
            });
        for (index, name) in names.iter().enumerate() {
            self.push(
                name,
                PropKind::NullableDouble,
                Value::Number(default),
                Some(index),
                Arc::clone(&setter),
            );
        }
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn into_bindings(self) -> Vec<PropertyBinding> {
        self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_api::ViewTag;

    fn element() -> Element {
        Element::new(ViewTag(1), "Test")
    }

    fn binding(manifest: PropertyManifest, name: &str) -> PropertyBinding {
        manifest
            .into_bindings()
            .into_iter()
            .find(|b| b.name == name)
            .unwrap()
    }

    #[test]
    fn test_double_default_on_null_and_missing() {
        let mut manifest = PropertyManifest::new();
        manifest.double("opacity", 1.0, |el, v| el.opacity = v);
        let opacity = binding(manifest, "opacity");

        let mut el = element();
        opacity.apply(&mut el, Some(&Value::from(0.25))).unwrap();
        assert_eq!(el.opacity, 0.25);
        opacity.apply(&mut el, Some(&Value::Null)).unwrap();
        assert_eq!(el.opacity, 1.0);
        el.opacity = 0.1;
        opacity.apply(&mut el, None).unwrap();
        assert_eq!(el.opacity, 1.0);
    }

    #[test]
    fn test_type_mismatch() {
        let mut manifest = PropertyManifest::new();
        manifest.double("opacity", 1.0, |el, v| el.opacity = v);
        let opacity = binding(manifest, "opacity");

        let mut el = element();
        let err = opacity.apply(&mut el, Some(&Value::from("half"))).unwrap_err();
        assert_eq!(
            err,
            UiError::PropertyType {
                property: "opacity".into(),
                expected: "number",
                found: "string",
            }
        );
        assert_eq!(el.opacity, 1.0);
    }

    #[test]
    fn test_int_requires_integral() {
        assert_eq!(
            PropKind::Int.convert("n", &Value::from(3.0)).unwrap(),
            PropArg::Int(3)
        );
        assert!(PropKind::Int.convert("n", &Value::from(3.5)).is_err());
    }

    #[test]
    fn test_color_accepts_signed_and_unsigned() {
        assert_eq!(
            PropKind::Color.convert("c", &Value::from(0xFF00FF00u32 as i64)).unwrap(),
            PropArg::Color(Some(0xFF00FF00))
        );
        assert_eq!(
            PropKind::Color.convert("c", &Value::from(-16777216i64)).unwrap(),
            PropArg::Color(Some(0xFF000000))
        );
        assert_eq!(
            PropKind::Color.convert("c", &Value::Null).unwrap(),
            PropArg::Color(None)
        );
        assert!(PropKind::Color.convert("c", &Value::from(1i64 << 33)).is_err());
        assert!(PropKind::Color.convert("c", &Value::from(0.5)).is_err());
    }

    #[test]
    fn test_group_passes_member_index() {
        let mut manifest = PropertyManifest::new();
        manifest.group_nullable_double(&["all", "left", "right"], f64::NAN, |el, index, v| {
            el.border_widths[index] = v.unwrap_or(f64::NAN);
        });
        assert_eq!(manifest.len(), 3);
        let bindings = manifest.into_bindings();

        let mut el = element();
        bindings[2].apply(&mut el, Some(&Value::from(4.0))).unwrap();
        assert_eq!(el.border_widths[2], 4.0);
        assert!(el.border_widths[1].is_nan());
        assert_eq!(bindings[2].group_index, Some(2));

        bindings[2].apply(&mut el, None).unwrap();
        assert!(el.border_widths[2].is_nan());
    }

    #[test]
    fn test_map_and_nullable_string() {
        let mut manifest = PropertyManifest::new();
        manifest
            .map("style", |el, map| {
                el.attributes
                    .insert("style".into(), map.cloned().map(Value::Map).unwrap_or_default());
            })
            .nullable_string("label", |el, s| {
                el.attributes.insert("label".into(), Value::from(s));
            });
        let bindings = manifest.into_bindings();

        let mut el = element();
        let style = Value::from_iter([("a", 1i64)]);
        bindings[0].apply(&mut el, Some(&style)).unwrap();
        assert_eq!(el.attributes.get("style"), Some(&style));
        bindings[1].apply(&mut el, None).unwrap();
        assert_eq!(el.attributes.get("label"), Some(&Value::Null));
        assert!(bindings[1].apply(&mut el, Some(&Value::from(1i64))).is_err());
    }
}
