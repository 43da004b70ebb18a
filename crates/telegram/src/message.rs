use serde::Serialize;

/// Characters that open an entity in Telegram's legacy Markdown.
const MARKDOWN_SPECIAL: &[char] = &['_', '*', '`', '['];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: ParseMode,
}

/// Assembles a quote message: an optional bold header line, then the quote
/// in italics.
pub struct MessageBuilder {
    header: Option<String>,
    body: String,
}

impl MessageBuilder {
    pub fn quote(text: &str) -> Self {
        Self { header: None, body: wrap_entity(text, '_') }
    }

    pub fn header(mut self, header: &str) -> Self {
        let header = header.trim();
        self.header = (!header.is_empty()).then(|| wrap_entity(header, '*'));
        self
    }

    pub fn render(&self) -> String {
        match &self.header {
            Some(header) => format!("{header}\n\n{}", self.body),
            None => self.body.clone(),
        }
    }

    pub fn build(self, chat_id: impl Into<String>) -> SendMessage {
        SendMessage {
            chat_id: chat_id.into(),
            text: self.render(),
            parse_mode: ParseMode::Markdown,
        }
    }
}

/// Wraps `text` in `delimiter` entities. Legacy Markdown cannot escape inside
/// an entity, so special characters close the entity, appear escaped, and the
/// entity reopens after them. Whitespace stays outside the delimiters.
fn wrap_entity(text: &str, delimiter: char) -> String {
    let mut output = String::with_capacity(text.len() + 8);
    let mut run = String::new();

    for ch in text.chars() {
        if MARKDOWN_SPECIAL.contains(&ch) {
            flush_run(&mut output, &mut run, delimiter);
            output.push('\\');
            output.push(ch);
        } else {
            run.push(ch);
        }
    }
    flush_run(&mut output, &mut run, delimiter);

    output
}

fn flush_run(output: &mut String, run: &mut String, delimiter: char) {
    let trimmed = run.trim();
    if trimmed.is_empty() {
        output.push_str(run);
    } else {
        let leading = &run[..run.len() - run.trim_start().len()];
        let trailing = &run[run.trim_end().len()..];
        output.push_str(leading);
        output.push(delimiter);
        output.push_str(trimmed);
        output.push(delimiter);
        output.push_str(trailing);
    }
    run.clear();
}
