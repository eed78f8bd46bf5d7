//! # Commands Module / 命令模块
//!
//! One module per `testr` subcommand.
//!
//! 每个 `testr` 子命令对应一个模块。

pub mod check_files;
pub mod regress;
pub mod run;
