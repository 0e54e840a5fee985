// src/present/mod.rs
pub mod chart;
mod tiles;

use crate::frame::{Frame, Value};
use prettytable::{format, Cell, Row, Table};

/// Render a whole frame as a boxed console table.
pub fn print_frame(frame: &Frame) {
    print_table(frame, frame.len());
}

/// First `limit` rows, with a footer when rows were elided.
pub fn print_frame_preview(frame: &Frame, limit: usize) {
    print_table(frame, limit);
    if frame.len() > limit {
        println!("… {} of {} rows shown", limit, frame.len());
    }
}

fn print_table(frame: &Frame, limit: usize) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(
        frame
            .columns()
            .iter()
            .map(|c| Cell::new(c).style_spec("bFg"))
            .collect(),
    ));
    for row in frame.rows().iter().take(limit) {
        table.add_row(Row::new(row.iter().map(cell_for).collect()));
    }
    table.printstd();
}

fn cell_for(value: &Value) -> Cell {
    let text = value.to_string();
    match value {
        Value::Int(_) | Value::Real(_) => Cell::new(&text).style_spec("r"),
        _ => Cell::new(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printing_does_not_disturb_the_frame() {
        let mut f = Frame::new(vec!["name".into(), "n".into()]);
        f.push_row(vec![Value::Text("x".into()), Value::Int(1)])
            .unwrap();
        f.push_row(vec![Value::Null, Value::Real(2.5)]).unwrap();
        print_frame(&f);
        print_frame_preview(&f, 1);
        assert_eq!(f.len(), 2);
    }
}
