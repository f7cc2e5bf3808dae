pub mod frame;
pub mod roots;
