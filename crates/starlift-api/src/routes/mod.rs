//! Control-plane route modules.

pub mod exports;
pub mod logs;
pub mod transfers;
pub mod tree;
