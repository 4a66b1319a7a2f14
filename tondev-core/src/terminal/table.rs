//! Plain-text table formatting.

/// Table rendering options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Insert a dashed line after the first row.
    pub header_separator: bool,
}

const COLUMN_GAP: &str = "  ";

/// Formats rows into left-aligned columns separated by two spaces.
///
/// Rows may be ragged; missing cells count as empty. Trailing whitespace is
/// trimmed from every line.
pub fn format_table<R, C>(rows: &[R], options: TableOptions) -> String
where
    R: AsRef<[C]>,
    C: AsRef<str>,
{
    let mut widths: Vec<usize> = Vec::new();
    for row in rows {
        for (i, cell) in row.as_ref().iter().enumerate() {
            let width = cell.as_ref().chars().count();
            if widths.len() <= i {
                widths.resize(i + 1, 0);
            }
            widths[i] = widths[i].max(width);
        }
    }

    let mut lines: Vec<String> = rows
        .iter()
        .map(|row| format_row(row.as_ref().iter().map(|cell| cell.as_ref()), &widths))
        .collect();

    if options.header_separator && !lines.is_empty() {
        let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let separator = format_row(dashes.iter().map(String::as_str), &widths);
        lines.insert(1, separator);
    }

    lines.join("\n")
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP)
        .trim_end()
        .to_string()
}
