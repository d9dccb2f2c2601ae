//! Octree assembly and storage
//!
//! Domain readers submit [OctBatch]es to an [OctreeBuilder](crate::traits::OctreeBuilder);
//! the finished [Octree](crate::traits::Octree) answers selection and coordinate queries.

mod batch;
mod container;
mod mask;

pub use self::batch::OctBatch;
pub use self::container::{Oct, RamsesOctree, RamsesOctreeBuilder};
pub use self::mask::OctMask;

/// Offset of child `octant` within its parent along each axis.
///
/// Octants are numbered `x + 2y + 4z`.
pub fn octant_offset(octant: usize) -> [usize; 3] {
    [octant & 1, (octant >> 1) & 1, (octant >> 2) & 1]
}
