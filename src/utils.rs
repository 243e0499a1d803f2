/// Rest countdown as `m:ss`.
pub fn format_countdown(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Strips ANSI colour escapes before measuring a cell's width.
pub fn plain_len(s: &str) -> usize {
    let mut n = 0;
    let mut esc = false;
    for c in s.chars() {
        match (esc, c) {
            (true, 'm') => esc = false,
            (true, _) => {}
            (false, '\x1B') => esc = true,
            (false, _) => n += 1,
        }
    }
    n
}
