pub mod relief;
pub mod stl;
pub mod surface;
