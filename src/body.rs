/// One rendered unit of a post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
}

/// Split post body text into blocks.
///
/// `# ` starts a level-1 heading, `## ` (or deeper) a level-2 heading, blank
/// lines end a paragraph and consecutive plain lines join into one paragraph.
pub fn parse_blocks(body: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    }

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if let Some(rest) = trimmed.strip_prefix('#') {
            flush(&mut paragraph, &mut blocks);
            let hashes = 1 + rest.chars().take_while(|c| *c == '#').count();
            let text = trimmed.trim_start_matches('#').trim();
            if !text.is_empty() {
                blocks.push(Block::Heading {
                    level: if hashes == 1 { 1 } else { 2 },
                    text: text.to_string(),
                });
            }
        } else {
            paragraph.push(trimmed);
        }
    }
    flush(&mut paragraph, &mut blocks);

    blocks
}

/// Body blocks as escaped HTML. Level-1 headings become `<h2>` because the
/// post title owns the page's `<h1>`.
pub fn to_html(body: &str) -> String {
    let mut html = String::new();
    for block in parse_blocks(body) {
        match block {
            Block::Heading { level, text } => {
                let tag = if level == 1 { "h2" } else { "h3" };
                html.push_str(&format!("<{tag}>{}</{tag}>", crate::render::html_escape(&text)));
            }
            Block::Paragraph(text) => {
                html.push_str(&format!("<p>{}</p>", crate::render::html_escape(&text)));
            }
        }
    }
    html
}
