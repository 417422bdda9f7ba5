//! UI batch protocol - the operations the scripted layer sends to the UI manager.
//!
//! A batch travels as a plain `Value` (a list of operation maps) so it can be
//! handed from the script thread to the UI thread without any engine state.
//! Each item carries an `op` key naming the operation.

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::{Map, Rect, Value, ViewTag};

/// Name reported for an item whose `op` is missing or not a string.
const UNNAMED_OP: &str = "<batch item>";

/// A malformed batch or batch item.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("batch must be a list of operations, got {0}")]
    NotAList(&'static str),

    #[error("operation must be a map, got {0}")]
    NotAMap(&'static str),

    /// The item did not decode; `message` is the decoder's error.
    #[error("{op}: {message}")]
    Decode { op: String, message: String },
}

/// A child to insert during `manageChildren`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildInsert {
    #[serde(deserialize_with = "view_tag")]
    pub tag: ViewTag,
    #[serde(deserialize_with = "child_index")]
    pub index: usize,
}

/// One UI-tree operation.
#[derive(Debug, Clone, PartialEq)]
pub enum UiOperation {
    CreateView {
        tag: ViewTag,
        class_name: String,
        props: Map,
    },
    UpdateView {
        tag: ViewTag,
        props: Map,
    },
    ManageChildren {
        parent: ViewTag,
        /// Indices of children to detach.
        remove: Vec<usize>,
        /// Children to insert, each at its target index.
        add: Vec<ChildInsert>,
        /// Indices of children detached only to be re-added in `add`.
        moves: Vec<usize>,
    },
    UpdateLayout {
        tag: ViewTag,
        rect: Rect,
    },
    RemoveView {
        tag: ViewTag,
    },
    ConfigureLayoutAnimation {
        config: Value,
    },
}

impl UiOperation {
    /// Wire name of the operation.
    pub fn kind(&self) -> &'static str {
        match self {
            UiOperation::CreateView { .. } => "createView",
            UiOperation::UpdateView { .. } => "updateView",
            UiOperation::ManageChildren { .. } => "manageChildren",
            UiOperation::UpdateLayout { .. } => "updateLayout",
            UiOperation::RemoveView { .. } => "removeView",
            UiOperation::ConfigureLayoutAnimation { .. } => "configureLayoutAnimation",
        }
    }

    /// The view the operation targets, if any.
    pub fn tag(&self) -> Option<ViewTag> {
        match self {
            UiOperation::CreateView { tag, .. }
            | UiOperation::UpdateView { tag, .. }
            | UiOperation::UpdateLayout { tag, .. }
            | UiOperation::RemoveView { tag } => Some(*tag),
            UiOperation::ManageChildren { parent, .. } => Some(*parent),
            UiOperation::ConfigureLayoutAnimation { .. } => None,
        }
    }

    /// Parse one operation map. Non-finite numbers decode as null.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let map = value.as_map().ok_or(ProtocolError::NotAMap(value.type_name()))?;
        serde_json::from_value::<WireOp>(value.to_json())
            .map(UiOperation::from)
            .map_err(|e| ProtocolError::Decode {
                op: map
                    .get("op")
                    .and_then(Value::as_str)
                    .unwrap_or(UNNAMED_OP)
                    .to_string(),
                message: e.to_string(),
            })
    }

    /// Encode back into the wire shape.
    pub fn to_value(&self) -> Value {
        // string-keyed plain data, serialization cannot fail
        serde_json::to_value(WireOp::from(self.clone()))
            .map(Value::from)
            .unwrap_or_default()
    }
}

/// Split a batch into per-item parse results.
///
/// Only a batch that is not a list fails as a whole. A bad item yields an
/// `Err` in its slot so the caller can report it and carry on.
pub fn parse_batch(
    batch: &Value,
) -> Result<Vec<Result<UiOperation, ProtocolError>>, ProtocolError> {
    let items = batch.as_list().ok_or(ProtocolError::NotAList(batch.type_name()))?;
    Ok(items.iter().map(UiOperation::from_value).collect())
}

/// Encode a list of operations as a batch value.
pub fn encode_batch(ops: &[UiOperation]) -> Value {
    Value::List(ops.iter().map(UiOperation::to_value).collect())
}

/// The operation map as scripts write it.
#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum WireOp {
    CreateView {
        #[serde(deserialize_with = "view_tag")]
        tag: ViewTag,
        #[serde(rename = "className")]
        class_name: String,
        #[serde(default, deserialize_with = "null_as_default")]
        props: Map,
    },
    UpdateView {
        #[serde(deserialize_with = "view_tag")]
        tag: ViewTag,
        #[serde(default, deserialize_with = "null_as_default")]
        props: Map,
    },
    ManageChildren {
        #[serde(deserialize_with = "view_tag")]
        tag: ViewTag,
        #[serde(default, deserialize_with = "child_indices")]
        remove: Vec<usize>,
        #[serde(default, deserialize_with = "null_as_default")]
        add: Vec<ChildInsert>,
        #[serde(rename = "move", default, deserialize_with = "child_indices")]
        moves: Vec<usize>,
    },
    UpdateLayout {
        #[serde(deserialize_with = "view_tag")]
        tag: ViewTag,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    RemoveView {
        #[serde(deserialize_with = "view_tag")]
        tag: ViewTag,
    },
    ConfigureLayoutAnimation {
        #[serde(default)]
        config: Value,
    },
}

impl From<WireOp> for UiOperation {
    fn from(wire: WireOp) -> Self {
        match wire {
            WireOp::CreateView { tag, class_name, props } => {
                UiOperation::CreateView { tag, class_name, props }
            }
            WireOp::UpdateView { tag, props } => UiOperation::UpdateView { tag, props },
            WireOp::ManageChildren { tag, remove, add, moves } => UiOperation::ManageChildren {
                parent: tag,
                remove,
                add,
                moves,
            },
            WireOp::UpdateLayout { tag, x, y, width, height } => UiOperation::UpdateLayout {
                tag,
                rect: Rect::new(x, y, width, height),
            },
            WireOp::RemoveView { tag } => UiOperation::RemoveView { tag },
            WireOp::ConfigureLayoutAnimation { config } => {
                UiOperation::ConfigureLayoutAnimation { config }
            }
        }
    }
}

impl From<UiOperation> for WireOp {
    fn from(op: UiOperation) -> Self {
        match op {
            UiOperation::CreateView { tag, class_name, props } => {
                WireOp::CreateView { tag, class_name, props }
            }
            UiOperation::UpdateView { tag, props } => WireOp::UpdateView { tag, props },
            UiOperation::ManageChildren { parent, remove, add, moves } => WireOp::ManageChildren {
                tag: parent,
                remove,
                add,
                moves,
            },
            UiOperation::UpdateLayout { tag, rect } => WireOp::UpdateLayout {
                tag,
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            },
            UiOperation::RemoveView { tag } => WireOp::RemoveView { tag },
            UiOperation::ConfigureLayoutAnimation { config } => {
                WireOp::ConfigureLayoutAnimation { config }
            }
        }
    }
}

/// A whole number within the safe-integer range, written as any number.
fn whole_number<'de, D>(deserializer: D, expected: &'static str) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = f64::deserialize(deserializer)?;
    Value::Number(n)
        .as_i64()
        .ok_or_else(|| D::Error::invalid_value(Unexpected::Float(n), &expected))
}

fn view_tag<'de, D>(deserializer: D) -> Result<ViewTag, D::Error>
where
    D: Deserializer<'de>,
{
    whole_number(deserializer, "an integral view tag").map(ViewTag)
}

fn child_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    const EXPECTED: &str = "a non-negative child index";
    let index = whole_number(deserializer, EXPECTED)?;
    usize::try_from(index)
        .map_err(|_| D::Error::invalid_value(Unexpected::Signed(index), &EXPECTED))
}

#[derive(Deserialize)]
#[serde(transparent)]
struct ChildIndex(#[serde(deserialize_with = "child_index")] usize);

fn child_indices<'de, D>(deserializer: D) -> Result<Vec<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let indices: Vec<ChildIndex> = null_as_default(deserializer)?;
    Ok(indices.into_iter().map(|ChildIndex(index)| index).collect())
}

/// An explicit `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
