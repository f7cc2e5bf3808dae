use glam::Vec4Swizzles;
use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::store::StrandBufferStore;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FrameWigMeta {
    pub vertex_count: usize,
    pub segment_count: usize,
}

/// One tick worth of strand positions, laid out `[vertex][segment]`.
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub t: u64,
    pub time: f32,
    pub wig: FrameWigMeta,
    pub positions: Vec<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

pub fn make_frame(
    t: u64,
    time: f32,
    store: &StrandBufferStore,
    diagnostics: Option<Diagnostics>,
) -> Frame {
    let positions = store
        .positions()
        .iter()
        .map(|p| p.xyz().to_array())
        .collect();
    Frame {
        t,
        time,
        wig: FrameWigMeta {
            vertex_count: store.vertex_count(),
            segment_count: store.segment_count(),
        },
        positions,
        diagnostics,
    }
}

impl Frame {
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}
