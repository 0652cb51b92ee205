use terminal_size::{terminal_size, Width};

/// Terminal width minus `margin`, 120 if stdout is not a terminal.
pub fn get_terminal_width(margin: usize) -> usize {
    if let Some((Width(width), _)) = terminal_size() {
        usize::from(width).saturating_sub(margin).max(40)
    } else {
        120
    }
}
