//! Plain text formats for memory images and end-of-run dumps.

use std::fmt::Write;

use crate::{
    error::ImageError,
    state::{MachineState, Memory},
};

/// Width of one column in a register dump.
const COLUMN_WIDTH: usize = 13;

/// One decimal word per line.
pub fn memory_dump(mem: &Memory) -> String {
    let mut out = String::with_capacity(mem.len() * 2);
    for word in mem.words() {
        // Writing to a `String` cannot fail
        let _ = writeln!(out, "{word}");
    }
    out
}

/// Fixed-width table with a header of element indices, a dashed rule and one row per
/// register.
pub fn register_table<'a>(width: usize, rows: impl IntoIterator<Item = &'a [i32]>) -> String {
    let mut out = String::new();
    for idx in 0..width {
        let _ = write!(out, "{:<width$}", idx, width = COLUMN_WIDTH);
    }
    out.push('\n');
    out.push_str(&"-".repeat(COLUMN_WIDTH * width));
    out.push('\n');
    for row in rows {
        for val in row {
            let _ = write!(out, "{:<width$}", val, width = COLUMN_WIDTH);
        }
        out.push('\n');
    }
    out
}

/// Contents of `SRF.txt`.
pub fn scalar_dump(state: &MachineState) -> String {
    register_table(
        1,
        state.scalar_regs().iter().map(std::slice::from_ref),
    )
}

/// Contents of `VRF.txt`.
pub fn vector_dump(state: &MachineState) -> String {
    let regs = state.vector_regs();
    register_table(
        regs[0].len(),
        regs.iter().map(|lanes| lanes.as_slice()),
    )
}

/// Parse a memory image: one decimal word per line, blank lines skipped.
pub fn parse_memory_image(text: &str) -> Result<Vec<i32>, ImageError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            line.trim().parse().map_err(|_| ImageError::InvalidWord {
                line: idx + 1,
                text: line.trim().to_string(),
            })
        })
        .collect()
}

/// Copy a memory image to the start of `mem`. Words past the end of the image are left alone.
pub fn load_memory_image(mem: &mut Memory, text: &str) -> Result<(), ImageError> {
    let image = parse_memory_image(text)?;
    mem.load(&image).map_err(|_| ImageError::TooLarge {
        space: mem.space(),
        len: image.len(),
        size: mem.len(),
    })?;
    log::debug!("loaded {} words of {}", image.len(), mem.space());
    Ok(())
}
