pub mod viewport;

pub use viewport::Viewport;

/// Renders `line` for display: tabs become spaces up to the next tab stop and
/// invalid UTF-8 is replaced.
pub fn expand_tabs(line: &[u8], tab_width: usize) -> String {
    let text = String::from_utf8_lossy(line);
    let tab_width = tab_width.max(1);
    let mut out = String::with_capacity(text.len());
    let mut width = 0;
    for c in text.chars() {
        if c == '\t' {
            let fill = tab_width - width % tab_width;
            out.extend(std::iter::repeat(' ').take(fill));
            width += fill;
        } else {
            out.push(c);
            width += 1;
        }
    }
    out
}

/// Screen column of byte `column` within `line`, after tab expansion.
///
/// UTF-8 continuation bytes take no space, so a multi-byte character counts
/// once.
pub fn display_column(line: &[u8], column: usize, tab_width: usize) -> usize {
    let tab_width = tab_width.max(1);
    line.iter().take(column).fold(0, |width, &byte| match byte {
        b'\t' => width + tab_width - width % tab_width,
        0x80..=0xBF => width,
        _ => width + 1,
    })
}
