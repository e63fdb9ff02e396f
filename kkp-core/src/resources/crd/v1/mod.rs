pub mod cloud;
pub mod cluster;
pub mod seed;
