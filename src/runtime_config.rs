//! # Runtime Configuration Module
//!
//! Coroutine runtime settings read from the environment at startup.
//!
//! ## `ITEMS_STACK_SIZE`
//!
//! Stack size for handler coroutines, decimal (`32768`) or hex (`0x8000`).
//! Default: `0x8000` (32 KB). Unparseable values fall back to the default.
//!
//! ```bash
//! ITEMS_STACK_SIZE=0x10000 items-api serve
//! ```

use std::env;
use tracing::info;

pub const STACK_SIZE_ENV: &str = "ITEMS_STACK_SIZE";
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Parse `0x`-prefixed hex or decimal; zero is rejected.
pub fn parse_stack_size(val: &str) -> Option<usize> {
    let val = val.trim();
    let parsed = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    };
    parsed.filter(|n| *n > 0)
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let stack_size = env::var(STACK_SIZE_ENV)
            .ok()
            .and_then(|v| parse_stack_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }

    /// Make this the stack size of every coroutine spawned afterwards.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
        info!(stack_size = self.stack_size, "Coroutine runtime configured");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0x8000", Some(0x8000))]
    #[case("0X4000", Some(0x4000))]
    #[case("65536", Some(65536))]
    #[case(" 4096 ", Some(4096))]
    #[case("0", None)]
    #[case("0xZZ", None)]
    #[case("big", None)]
    fn test_parse_stack_size(#[case] input: &str, #[case] expected: Option<usize>) {
        assert_eq!(parse_stack_size(input), expected);
    }

    #[test]
    fn test_default() {
        assert_eq!(RuntimeConfig::default().stack_size, 0x8000);
    }
}
