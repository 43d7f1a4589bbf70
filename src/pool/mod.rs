//! 代理池模块
//!
//! 提供账号与代理的分配、持久化和失效代理下线功能

pub mod allocator;
pub mod assignment;
pub mod proxy_list;
pub mod retirement;

pub use allocator::allocate;
pub use assignment::{Assignment, AssignmentStore, StoreError};
pub use proxy_list::{read_entries, ProxyList};
pub use retirement::ProxyRetirement;
