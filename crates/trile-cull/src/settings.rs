use serde::{Deserialize, Serialize};

/// Tunables for the cull strategies, read from the `[cull]` config table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullSettings {
    /// Extra columns kept around the viewport in single-face mode.
    pub column_margin: i32,
    /// Extra rows kept above and below the viewport in two-face mode.
    pub row_margin: i32,
    /// Vertical distance from the camera within which tri-face keeps border blocks.
    pub tri_face_height: f32,
    /// Vertical distance from the camera within which no-cull keeps everything.
    pub no_cull_height: f32,
}

impl Default for CullSettings {
    fn default() -> Self {
        Self {
            column_margin: 1,
            row_margin: 2,
            tri_face_height: 16.0,
            no_cull_height: 32.0,
        }
    }
}
