//! # Pigpio CLI
//!
//! pigpio 守护进程命令行控制工具。
//!
//! ```bash
//! # 读取 GPIO 17
//! pigpio-cli read 17
//!
//! # 写入并查询模式
//! pigpio-cli write 17 1
//! pigpio-cli mode 17 --set output
//!
//! # 实时监控边沿（Ctrl-C 退出）
//! pigpio-cli --host raspberrypi.local watch 17 --edge either
//! ```
//!
//! 默认地址取 `PIGPIO_ADDR` / `PIGPIO_PORT`，`--host`/`--port`
//! 优先级更高。

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pigpio_sdk::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

mod commands;

/// pigpio 守护进程命令行工具
#[derive(Parser, Debug)]
#[command(name = "pigpio-cli")]
#[command(about = "Command-line control tool for the pigpio daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// 守护进程地址（默认取 PIGPIO_ADDR，再默认 127.0.0.1）
    #[arg(long, global = true)]
    host: Option<String>,

    /// 守护进程端口（默认取 PIGPIO_PORT，再默认 8888）
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 读取 GPIO 电平
    Read { gpio: u32 },

    /// 写入 GPIO 电平（0/1）
    Write { gpio: u32, level: u8 },

    /// 查询或设置 GPIO 模式
    Mode {
        gpio: u32,
        /// 目标模式（input/output/alt0-alt5），省略则查询
        #[arg(long)]
        set: Option<String>,
    },

    /// 守护进程信息（版本、硬件版本、tick、bank 1 快照）
    Info,

    /// 发送触发脉冲
    Trigger {
        gpio: u32,
        /// 脉冲长度（微秒，1-100）
        #[arg(long, default_value_t = 10)]
        pulse_len: u32,
        /// 脉冲电平（0/1）
        #[arg(long, default_value_t = 1)]
        level: u8,
    },

    /// 实时监控 GPIO 边沿（Ctrl-C 退出）
    Watch {
        gpio: u32,
        /// 边沿过滤（rising/falling/either）
        #[arg(long, default_value = "either")]
        edge: String,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pigpio_cli=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ConnectionConfig::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let pi = Pigpio::connect_with_config(config.clone())
        .with_context(|| format!("failed to connect to pigpiod at {}:{}", config.host, config.port))?;
    tracing::debug!("connected to pigpiod at {}:{}", config.host, config.port);

    let result = run(&pi, cli.command);
    pi.stop().ok();
    result
}

fn run(pi: &Pigpio, command: Commands) -> Result<()> {
    match command {
        Commands::Read { gpio } => {
            let level = pi.read(gpio)?;
            println!("{}", u32::from(level));
        },
        Commands::Write { gpio, level } => {
            pi.write(gpio, commands::parse_level(level)?)?;
        },
        Commands::Mode { gpio, set } => match set {
            Some(mode) => pi.set_mode(gpio, commands::parse_mode(&mode)?)?,
            None => println!("{:?}", pi.get_mode(gpio)?),
        },
        Commands::Info => {
            println!("pigpio version:    {}", pi.get_pigpio_version()?);
            println!("hardware revision: {:#x}", pi.get_hardware_revision()?);
            println!("current tick:      {} us", pi.get_current_tick()?);
            println!("bank 1 levels:     {:#010x}", pi.read_bank_1()?);
        },
        Commands::Trigger {
            gpio,
            pulse_len,
            level,
        } => {
            pi.gpio_trigger(gpio, pulse_len, commands::parse_level(level)?)?;
        },
        Commands::Watch { gpio, edge } => {
            watch(pi, gpio, commands::parse_edge(&edge)?)?;
        },
    }
    Ok(())
}

fn watch(pi: &Pigpio, gpio: u32, edge: Edge) -> Result<()> {
    let cb = pi.on_edge(gpio, edge, |gpio: u8, level: Level, tick: u32| {
        match level {
            Level::Timeout => println!("gpio {gpio}: watchdog timeout @ {tick} us"),
            real => println!("gpio {gpio} -> {} @ {tick} us", u32::from(real)),
        }
    })?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    eprintln!("watching gpio {gpio} ({edge:?}), press Ctrl-C to exit");
    while running.load(Ordering::SeqCst) {
        if !pi.is_alive() {
            bail!("connection to pigpiod lost");
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    eprintln!("total transitions: {}", cb.tally());
    cb.cancel()?;
    Ok(())
}
