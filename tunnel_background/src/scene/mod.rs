pub(crate) mod materials;
pub(crate) mod scroll;
pub(crate) mod tunnel;

pub use materials::brick_material;
pub use scroll::{AnimatorState, ScrollAnimator, ScrollOffset, TunnelState};
pub use tunnel::{
    apothem, build_tunnel, Brick, RowSection, SectorNode, TunnelGeometry, TunnelLayout,
    TunnelRoot, BRICK_DEPTH, BRICK_GAP, BRICK_HEIGHT, BRICK_HEIGHT_JITTER, BRICK_TILT,
};
