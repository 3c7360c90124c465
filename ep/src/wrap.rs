//! Fixed-width text wrapping for generated prompts

/// Wrap text to `width` columns
///
/// Each input line is filled greedily on its own, so the markdown structure
/// of the generated prompt (headings, bullets, blank lines) survives. Lines
/// that fit are left untouched. In longer lines, runs of whitespace collapse
/// to one space, leading indentation is kept, and words longer than the
/// width are split.
pub fn fill(text: &str, width: usize) -> String {
    let width = width.max(1);
    text.lines()
        .map(|line| fill_line(line, width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn fill_line(line: &str, width: usize) -> String {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return String::new();
    }
    // Lines that already fit keep their spacing (tables, code)
    let line = line.trim_end();
    if line.chars().count() <= width {
        return line.to_string();
    }

    let indent_len = line.chars().take_while(|c| c.is_whitespace()).count();
    // Indentation that leaves no room for text is dropped
    let indent: String = if indent_len < width {
        line.chars().take(indent_len).map(|c| if c == '\t' { ' ' } else { c }).collect()
    } else {
        String::new()
    };
    let indent_width = indent.chars().count();

    let mut lines: Vec<String> = Vec::new();
    let mut current = indent.clone();
    let mut current_width = indent_width;

    for word in trimmed.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let at_line_start = current_width == indent_width;
            let needed = if at_line_start { word.len() } else { word.len() + 1 };

            if current_width + needed <= width {
                if !at_line_start {
                    current.push(' ');
                }
                current.extend(word.iter());
                current_width += needed;
                break;
            }

            if !at_line_start {
                lines.push(std::mem::replace(&mut current, indent.clone()));
                current_width = indent_width;
                continue;
            }

            // Word alone is wider than the line: split it
            let room = width - indent_width;
            let rest = word.split_off(room);
            current.extend(word.iter());
            lines.push(std::mem::replace(&mut current, indent.clone()));
            current_width = indent_width;
            word = rest;
        }
    }

    if current_width > indent_width {
        lines.push(current);
    }
    lines.join("\n")
}
