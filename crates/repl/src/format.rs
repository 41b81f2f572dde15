//! Value Formatting
//!
//! Renders operand-stack contents for humans, bottom of the stack on the
//! left. Lists print in element order (`[ 1 2 3 ]`), which means walking
//! the payload downward from the header; nested lists recurse. Code and
//! builtin references print as `@name` when the symbol table still knows a
//! name for them.

use stax_vm::{Cell, Tag, Vm};

/// Render the whole operand stack, bottom first.
pub fn format_stack(vm: &Vm) -> String {
    let cells = vm.stack_cells();
    let mut rendered = Vec::new();
    let mut top = cells.len();
    while top > 0 {
        let (text, span) = element_text(vm, &cells, top - 1);
        rendered.push(text);
        top -= span;
    }
    rendered.reverse();
    rendered.join(" ")
}

/// Render the element whose top cell is `cells[top]`; returns the text and
/// the element's span.
fn element_text(vm: &Vm, cells: &[Cell], top: usize) -> (String, usize) {
    let cell = cells[top];
    match cell.tag() {
        Tag::List => {
            let slots = usize::from(cell.payload());
            if slots + 1 > top + 1 {
                // A sheared header should never reach the formatter, but
                // rendering it beats panicking in a debugging tool.
                return (format!("<list:{slots}?>"), 1);
            }
            let mut parts = Vec::new();
            let mut pos = top;
            let mut consumed = 0;
            while consumed < slots {
                let (text, span) = element_text(vm, cells, pos - 1);
                parts.push(text);
                consumed += span;
                pos -= span;
            }
            let text = if parts.is_empty() {
                "[ ]".to_string()
            } else {
                format!("[ {} ]", parts.join(" "))
            };
            (text, slots + 1)
        }
        _ => (simple_text(vm, cell), 1),
    }
}

/// Render a single-cell value.
fn simple_text(vm: &Vm, cell: Cell) -> String {
    match cell.tag() {
        Tag::Number => format_number(cell.as_number()),
        Tag::Integer => {
            if cell.is_nil() {
                "NIL".to_string()
            } else {
                cell.as_int().to_string()
            }
        }
        Tag::String => match vm.string_at(cell.payload()) {
            Ok(text) => format!("{text:?}"),
            Err(_) => format!("<string:0x{:04x}>", cell.payload()),
        },
        Tag::Symbol => match vm.string_at(cell.payload()) {
            Ok(text) => format!("`{text}"),
            Err(_) => format!("<symbol:0x{:04x}>", cell.payload()),
        },
        Tag::Code | Tag::Builtin => match vm.symbols.name_for(cell) {
            Some(name) => format!("@{name}"),
            None if cell.is_code() => format!("<code:0x{:04x}>", cell.payload()),
            None => format!("<builtin:{}>", cell.payload()),
        },
        Tag::List => unreachable!("lists render through element_text"),
    }
}

/// Whole-valued floats print without a fraction, the way a stack language
/// user expects `2 3 +` to read `5`.
fn format_number(f: f32) -> String {
    if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e7 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}
