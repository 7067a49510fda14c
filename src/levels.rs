//! Multi-level text files.
//!
//! Levels are runs of board rows. Anything else ends the current level:
//! blank lines, `;` comments and title lines such as `Level 12`.

use memchr::memchr_iter;

fn lines(text: &str) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    let mut start = 0;
    memchr_iter(b'\n', bytes)
        .chain(std::iter::once(bytes.len()))
        .map(move |end| {
            let line = &text[start..end];
            start = end + 1;
            line.trim_end_matches('\r')
        })
}

fn is_board_row(line: &str) -> bool {
    line.contains('#') && line.chars().all(|ch| matches!(ch, '#' | '$' | '.' | '*' | '@' | '+' | ' ' | '-' | '_'))
}

/// Splits `text` into one string per level, rows joined by `'\n'`.
pub fn split_levels(text: &str) -> Vec<String> {
    let mut levels = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines(text) {
        if is_board_row(line) {
            current.push(line);
        } else if !current.is_empty() {
            levels.push(current.join("\n"));
            current.clear();
        }
    }
    if !current.is_empty() {
        levels.push(current.join("\n"));
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines_comments_and_titles() {
        let text = "; pack\r\n\
                    Level 1\r\n\
                    ####\r\n\
                    #@$.#\r\n\
                    ####\r\n\
                    \r\n\
                    #####\n\
                    #+*$.#\n\
                    ; trailing note\n\
                    Title: two\n\
                    ####\n\
                    #@*#\n\
                    ####";
        let levels = split_levels(text);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], "####\n#@$.#\n####");
        assert_eq!(levels[1], "#####\n#+*$.#");
        assert_eq!(levels[2], "####\n#@*#\n####");
    }

    #[test]
    fn empty_input_has_no_levels() {
        assert!(split_levels("").is_empty());
        assert!(split_levels("\n\n; nothing\n").is_empty());
    }
}
