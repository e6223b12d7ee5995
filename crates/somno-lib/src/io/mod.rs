pub mod imu;
pub mod text;
