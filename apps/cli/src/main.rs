//! # talon-dump
//!
//! Talon CAN 驱动的命令行帧转储工具：打开接口，轮询给定的
//! 仲裁 ID，把取到的帧打印到 stdout。原 ROS 节点包装层在
//! 本仓库里的最小替身，也是排查总线问题的第一件工具。
//!
//! ```bash
//! # 单总线拓扑，轮询两个驱动器的反馈 ID
//! talon-dump --rx-interface can0 --ids 0x02041400,0x02041440
//!
//! # 读写走不同的总线段
//! talon-dump --rx-interface can1 --tx-interface can0 --ids 0x02041400
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use talon_driver::{CanInterfaceBuilder, PipelineConfig};
use tracing::info;

/// Talon CAN frame dumper
#[derive(Parser, Debug)]
#[command(name = "talon-dump")]
#[command(about = "Poll and print the freshest frame per arbitration ID", long_about = None)]
#[command(version)]
struct Cli {
    /// 读路径的 SocketCAN 接口名
    #[arg(long, default_value = "can0")]
    rx_interface: String,

    /// 写路径的 SocketCAN 接口名（默认与读路径相同）
    #[arg(long)]
    tx_interface: Option<String>,

    /// 要轮询的仲裁 ID（十六进制，逗号分隔）
    #[arg(long, value_delimiter = ',', value_parser = parse_hex_id, required = true)]
    ids: Vec<u32>,

    /// 轮询间隔（毫秒）
    #[arg(long, default_value_t = 10)]
    poll_interval_ms: u64,

    /// CAN 接收超时（毫秒）
    #[arg(long, default_value_t = 2)]
    receive_timeout_ms: u64,
}

fn parse_hex_id(s: &str) -> Result<u32, String> {
    let trimmed = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(trimmed, 16).map_err(|e| format!("invalid arbitration ID '{s}': {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = running.clone();
    ctrlc::set_handler(move || {
        running_ctrlc.store(false, Ordering::Release);
    })
    .context("failed to install Ctrl-C handler")?;

    let mut builder = CanInterfaceBuilder::new()
        .rx_interface(&cli.rx_interface)
        .pipeline_config(PipelineConfig {
            receive_timeout_ms: cli.receive_timeout_ms,
        });
    if let Some(tx_interface) = &cli.tx_interface {
        builder = builder.tx_interface(tx_interface);
    }

    let iface = builder.open().with_context(|| {
        format!("failed to open CAN interface (rx={})", cli.rx_interface)
    })?;

    info!(
        "polling {} arbitration ID(s), Ctrl-C to stop",
        cli.ids.len()
    );

    while running.load(Ordering::Acquire) {
        for &id in &cli.ids {
            if let Some(frame) = iface.receive(id, 0) {
                println!(
                    "0x{:08X} [{}] {}",
                    frame.id,
                    frame.len,
                    frame
                        .data_slice()
                        .iter()
                        .map(|b| format!("{b:02X}"))
                        .collect::<Vec<_>>()
                        .join(" ")
                );
            }
        }
        std::thread::sleep(Duration::from_millis(cli.poll_interval_ms));
    }

    let metrics = iface.metrics();
    info!(
        "done: {} frames received, {} deposited, {} read errors",
        metrics.rx_frames_total, metrics.rx_frames_deposited, metrics.rx_errors
    );

    Ok(())
}
