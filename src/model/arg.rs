use clap::Parser;

/// 多账号代理设备节点
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<String>,

    /// 账号列表文件（每行一个账号）
    #[arg(long, default_value = "users.txt")]
    pub accounts: String,

    /// 代理列表文件（每行一个代理）
    #[arg(long, default_value = "proxy.txt")]
    pub proxies: String,

    /// 账号与代理分配关系的持久化文件
    #[arg(long, default_value = "account_proxies.json")]
    pub assignments: String,

    /// 失效代理日志文件
    #[arg(long, default_value = "logs.txt")]
    pub failure_log: String,

    /// 分配代理时的随机种子（用于复现分配结果）
    #[arg(long)]
    pub seed: Option<u64>,
}
