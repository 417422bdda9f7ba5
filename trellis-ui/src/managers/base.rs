//! Properties every view supports: opacity, elevation and the transform.

use trellis_api::Map;

use crate::element::Element;
use crate::props::PropertyManifest;

pub const PROP_OPACITY: &str = "opacity";
pub const PROP_ELEVATION: &str = "elevation";
pub const PROP_SCALE_X: &str = "scaleX";
pub const PROP_SCALE_Y: &str = "scaleY";
pub const PROP_TRANSLATE_X: &str = "translateX";
pub const PROP_TRANSLATE_Y: &str = "translateY";
pub const PROP_DECOMPOSED_MATRIX: &str = "decomposedMatrix";

const MATRIX_ROTATE_X: &str = "rotateX";
const MATRIX_ROTATE_Y: &str = "rotateY";

pub fn base_view_properties(manifest: &mut PropertyManifest) {
    manifest
        .double(PROP_OPACITY, 1.0, |el, v| el.opacity = v)
        .double(PROP_ELEVATION, 0.0, |el, v| el.ensure_transform().translate_z = v)
        .double(PROP_SCALE_X, 1.0, |el, v| el.ensure_transform().scale_x = v)
        .double(PROP_SCALE_Y, 1.0, |el, v| el.ensure_transform().scale_y = v)
        .double(PROP_TRANSLATE_X, 0.0, |el, v| el.ensure_transform().translate_x = v)
        .double(PROP_TRANSLATE_Y, 0.0, |el, v| el.ensure_transform().translate_y = v)
        .map(PROP_DECOMPOSED_MATRIX, |el, matrix| match matrix {
            Some(matrix) => set_transform_matrix(el, matrix),
            None => reset_transform_matrix(el),
        });
}

fn set_transform_matrix(element: &mut Element, matrix: &Map) {
    let read = |name: &str| matrix.get(name).and_then(|v| v.as_f64());
    let transform = element.ensure_transform();
    if let Some(v) = read(PROP_TRANSLATE_X) {
        transform.translate_x = v;
    }
    if let Some(v) = read(PROP_TRANSLATE_Y) {
        transform.translate_y = v;
    }
    if let Some(v) = read(MATRIX_ROTATE_X) {
        transform.rotation_x = v;
    }
    if let Some(v) = read(MATRIX_ROTATE_Y) {
        transform.rotation_y = v;
    }
    if let Some(v) = read(PROP_SCALE_X) {
        transform.scale_x = v;
    }
    if let Some(v) = read(PROP_SCALE_Y) {
        transform.scale_y = v;
    }
}

fn reset_transform_matrix(element: &mut Element) {
    let transform = element.ensure_transform();
    transform.translate_x = 0.0;
    transform.translate_y = 0.0;
    transform.rotation_x = 0.0;
    transform.rotation_y = 0.0;
    transform.scale_x = 1.0;
    transform.scale_y = 1.0;
}
