pub mod cpt;
pub mod cpt_loader;
pub mod diagnostics;
pub mod key_format;
pub mod placement;
pub mod render_adapter;

pub use cpt::{normalize, NormalizedCpt};
pub use cpt_loader::{load_all, CptEntry, CptMap};
pub use diagnostics::{Diagnostics, InferenceOutcome, InferenceRequest};
pub use key_format::format_key;
pub use placement::{compute_placement, Direction, Placement, PlacementConfig};
pub use render_adapter::{GraphRenderAdapter, RenderData, RenderSurface, SurfaceEvent, SurfaceFactory};
