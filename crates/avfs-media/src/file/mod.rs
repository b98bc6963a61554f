//! Virtual AVI files.
//!
//! [`AviFile::open`] plans the container once; [`AviFile::read_at`] then
//! serves any byte range, pulling frames and samples from the source only
//! for the data chunks the range touches.

mod cursor;
mod read;

pub use cursor::AviCursor;

use crate::plan::{ContainerPlan, PlanBuilder};
use crate::source::ClipSource;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// A planned AVI file over a clip source.
///
/// Shared through `Arc`: the file stays alive while any reader holds it.
pub struct AviFile {
    name: String,
    plan: ContainerPlan,
    source: Arc<dyn ClipSource>,
    /// Holds one sample frame for reads that start or end mid-sample.
    scratch: Mutex<Vec<u8>>,
}

impl AviFile {
    /// Plan the file for `source` using the options it requests.
    pub fn open(source: Arc<dyn ClipSource>) -> Result<Arc<Self>> {
        let options = source.avi_options();
        let plan = PlanBuilder::new(source.clip_info())
            .options(options)
            .build()?;
        let sample_size = plan.audio.as_ref().map_or(0, |a| a.sample_size as usize);
        let name = format!("{}.avi", source.name());

        tracing::info!(
            name = %name,
            size = plan.file_size,
            segments = plan.segments.len(),
            "Opened virtual AVI"
        );

        Ok(Arc::new(Self {
            name,
            plan,
            source,
            scratch: Mutex::new(vec![0; sample_size]),
        }))
    }

    /// Virtual file name, `<clip>.avi`.
    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn file_size(&self) -> u64 {
        self.plan.file_size
    }

    pub fn plan(&self) -> &ContainerPlan {
        &self.plan
    }

    pub fn source(&self) -> &Arc<dyn ClipSource> {
        &self.source
    }

    /// Sequential reader starting at offset 0.
    pub fn cursor(self: &Arc<Self>) -> AviCursor {
        AviCursor::new(Arc::clone(self))
    }
}

impl std::fmt::Debug for AviFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AviFile")
            .field("name", &self.name)
            .field("size", &self.plan.file_size)
            .field("segments", &self.plan.segments.len())
            .finish()
    }
}
