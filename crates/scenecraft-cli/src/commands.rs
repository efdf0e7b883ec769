pub mod describe;
pub mod scan;
pub mod session;
