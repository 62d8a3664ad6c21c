//! 命令行参数到协议枚举的转换

use anyhow::{Result, bail};
use pigpio_sdk::prelude::*;

pub fn parse_level(level: u8) -> Result<Level> {
    match level {
        0 => Ok(Level::Low),
        1 => Ok(Level::High),
        other => bail!("level must be 0 or 1, got {other}"),
    }
}

pub fn parse_edge(edge: &str) -> Result<Edge> {
    match edge.to_ascii_lowercase().as_str() {
        "rising" | "r" => Ok(Edge::Rising),
        "falling" | "f" => Ok(Edge::Falling),
        "either" | "e" => Ok(Edge::Either),
        other => bail!("unknown edge '{other}' (expected rising/falling/either)"),
    }
}

pub fn parse_mode(mode: &str) -> Result<Mode> {
    match mode.to_ascii_lowercase().as_str() {
        "input" | "in" | "r" => Ok(Mode::Input),
        "output" | "out" | "w" => Ok(Mode::Output),
        "alt0" => Ok(Mode::Alt0),
        "alt1" => Ok(Mode::Alt1),
        "alt2" => Ok(Mode::Alt2),
        "alt3" => Ok(Mode::Alt3),
        "alt4" => Ok(Mode::Alt4),
        "alt5" => Ok(Mode::Alt5),
        other => bail!("unknown mode '{other}'"),
    }
}
