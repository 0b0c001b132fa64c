//! Clipforge Edit Model
//!
//! Defines the data contracts of an editing session:
//! - **Timeline:** Ordered, non-destructive clips over one source asset
//! - **Effects:** Preset + adjustment stack compiled to a transform descriptor
//! - **Overlays:** Timed text captions and picture-in-picture layers
//! - **Transitions:** Catalog of preview transitions and fades
//! - **Session:** The single owner of all of the above, persisted as JSON
//!
//! Clip bounds are in source seconds. Overlay windows are in global seconds
//! (position on the concatenated timeline). Overlay positions are percent
//! coordinates in `[0, 100]` relative to the rendering surface.

pub mod clip;
pub mod color;
pub mod effects;
pub mod geometry;
pub mod gesture;
pub mod media;
pub mod overlay;
pub mod session;
pub mod timeline;
pub mod transition;

pub use clip::*;
pub use color::*;
pub use effects::*;
pub use geometry::*;
pub use gesture::*;
pub use media::*;
pub use overlay::*;
pub use session::*;
pub use timeline::*;
pub use transition::*;
