pub mod evaluate;
pub mod matcher;
pub mod subscription;
