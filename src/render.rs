use colored::{ColoredString, Colorize};

const BULLET: &str = "•";

pub fn markdown(source: &str) -> String {
    let mut rendered = Vec::new();
    let mut in_fence = false;

    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }

        if in_fence {
            rendered.push(format!("    {}", line.yellow()));
            continue;
        }

        rendered.push(render_line(line));
    }

    rendered.join("\n")
}

fn render_line(line: &str) -> String {
    let trimmed = line.trim_start();

    if let Some((level, text)) = heading(trimmed) {
        let text = strip_inline_markers(text);
        return match level {
            1 => text.magenta().bold().underline().to_string(),
            2 => text.cyan().bold().to_string(),
            _ => text.bold().to_string(),
        };
    }

    if let Some(item) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        let indent = &line[..line.len() - trimmed.len()];
        return format!("{indent}  {BULLET} {}", inline(item));
    }

    inline(line)
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    line[level..]
        .strip_prefix(' ')
        .map(|text| (level, text.trim()))
}

fn strip_inline_markers(text: &str) -> String {
    text.replace("**", "").replace('`', "")
}

fn inline(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        let next_code = rest.find('`');
        let next_strong = rest.find("**");

        match (next_code, next_strong) {
            (Some(code), strong) if strong.is_none_or(|s| code < s) => {
                out.push_str(&rest[..code]);
                let after = &rest[code + 1..];
                match after.find('`') {
                    Some(end) => {
                        out.push_str(&style_code(&after[..end]).to_string());
                        rest = &after[end + 1..];
                    }
                    None => {
                        out.push_str(&rest[code..]);
                        rest = "";
                    }
                }
            }
            (_, Some(strong)) => {
                out.push_str(&rest[..strong]);
                let after = &rest[strong + 2..];
                match after.find("**") {
                    Some(end) => {
                        out.push_str(&after[..end].bold().to_string());
                        rest = &after[end + 2..];
                    }
                    None => {
                        out.push_str(&rest[strong..]);
                        rest = "";
                    }
                }
            }
            _ => {
                out.push_str(rest);
                rest = "";
            }
        }
    }

    out
}

fn style_code(code: &str) -> ColoredString {
    code.yellow()
}
