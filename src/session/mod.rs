//! 设备会话模块
//!
//! 每个 (账号, 代理) 对应一条与远端的持久会话：
//! - `device_id`: 由代理地址派生的稳定设备 ID
//! - `protocol`: 远端消息格式
//! - `error`: 会话错误与失败分类
//! - `state`: worker 状态机
//! - `worker`: 单条连接的生命周期
//! - `supervisor`: 批量启动与托管

pub mod device_id;
pub mod error;
pub mod protocol;
pub mod state;
pub mod supervisor;
pub mod worker;

pub use supervisor::Supervisor;
