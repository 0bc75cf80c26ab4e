use serde::{Deserialize, Serialize};

/// Attribute names of the segmentation point layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgoFields {
    pub level_path: String,
    pub seg_distance: String,
    pub stream_size: String,
}

impl Default for IgoFields {
    fn default() -> Self {
        Self {
            level_path: "level_path".into(),
            seg_distance: "seg_distance".into(),
            stream_size: "stream_size".into(),
        }
    }
}

/// Attribute names of the DGO polygon layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DgoFields {
    pub level_path: String,
    pub seg_distance: String,
    pub centerline_length: String,
    pub segment_area: String,
}

impl Default for DgoFields {
    fn default() -> Self {
        Self {
            level_path: "level_path".into(),
            seg_distance: "seg_distance".into(),
            centerline_length: "centerline_length".into(),
            segment_area: "segment_area".into(),
        }
    }
}

/// Field-name mapping for every network layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkFields {
    pub igo: IgoFields,
    pub dgo: DgoFields,
    /// Level path attribute on flowline and centerline layers.
    pub line_level_path: String,
}

impl Default for NetworkFields {
    fn default() -> Self {
        Self {
            igo: IgoFields::default(),
            dgo: DgoFields::default(),
            line_level_path: "level_path".into(),
        }
    }
}
