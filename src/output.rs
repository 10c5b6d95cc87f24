use std::cell::RefCell;
use std::fmt::Display;
use std::path::Path;

use colored::Colorize;

use crate::state::MachineState;

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
}

/// Returns the previous value.
pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

/// Status line with a right-aligned colored verb. Silent if `--minimal`.
pub fn message(color: MsgColor, left: &str, right: impl Display) {
    if is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

pub fn file_message(color: MsgColor, left: &str, right: &Path) {
    message(color, left, format!("target {}", right.display()));
}

/// Print scalar registers and vector control state to stdout.
///
/// Minimal output is one `NAME value` pair per line, suited for blackbox tests.
pub fn print_registers(state: &MachineState) {
    let regs = state.scalar_regs();
    if is_minimal() {
        for (i, val) in regs.iter().enumerate() {
            println!("SR{i} {val}");
        }
        println!("VL {}", state.vlen());
        println!("VM {}", state.mask.count_ones());
        return;
    }

    println!("\x1b[2m┌──────────────────────────────┐\x1b[0m");
    println!("\x1b[2m│        \x1b[3m     int         hex\x1b[0m\x1b[2m  │\x1b[0m");
    for (i, val) in regs.iter().enumerate() {
        println!(
            "\x1b[2m│\x1b[0m \x1b[1mSR{i}\x1b[0m  {val:>11}  0x{val:08x} \x1b[2m│\x1b[0m"
        );
    }
    println!(
        "\x1b[2m│\x1b[0m \x1b[1mVL\x1b[0m   {:>11}   \x1b[1mVM\x1b[0m {:>3}/64 \x1b[2m│\x1b[0m",
        state.vlen(),
        state.mask.count_ones()
    );
    println!("\x1b[2m└──────────────────────────────┘\x1b[0m");
}
