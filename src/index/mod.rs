pub mod frame;
pub mod framer;
pub mod posting;
pub mod value_index;
