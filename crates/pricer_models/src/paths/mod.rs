//! Time grids, joint paths and path generators.

mod generator;
mod grid;
mod multi_path;

pub use generator::{
    make_multi_path_generator, CrossAssetPathGenerator, MultiPathGenerator, SequenceType,
};
pub use grid::TimeGrid;
pub use multi_path::MultiPath;
