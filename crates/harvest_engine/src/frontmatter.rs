/// Ordered metadata block written at the top of each Markdown file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    entries: Vec<(String, String)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, keeping the position of an existing entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `---` delimited block, one `key: value` line per entry.
    pub fn render(&self) -> String {
        let mut block = String::from("---\n");
        for (key, value) in self.iter() {
            block.push_str(key);
            block.push_str(": ");
            block.push_str(&yaml_scalar(value));
            block.push('\n');
        }
        block.push_str("---\n");
        block
    }
}

/// Plain scalar when YAML would read it back unchanged, double-quoted otherwise.
fn yaml_scalar(value: &str) -> String {
    if is_plain_safe(value) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn is_plain_safe(value: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`',
    ];
    const RESERVED: &[&str] = &["true", "false", "yes", "no", "on", "off", "null", "~"];

    let Some(first) = value.chars().next() else {
        return false;
    };
    if INDICATORS.contains(&first) || first.is_whitespace() {
        return false;
    }
    if value.ends_with(char::is_whitespace)
        || value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.chars().any(|c| c.is_control())
    {
        return false;
    }
    if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(value)) {
        return false;
    }
    // Numbers and dates would change type when read back.
    !value.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '+')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entries_keep_insertion_order() {
        let mut fm = FrontMatter::new();
        fm.insert("title", "Hello");
        fm.insert("author", "Ann");
        fm.insert("title", "Hello again");
        assert_eq!(fm.keys().collect::<Vec<_>>(), vec!["title", "author"]);
        assert_eq!(fm.get("title"), Some("Hello again"));
        assert_eq!(
            fm.iter().collect::<Vec<_>>(),
            vec![("title", "Hello again"), ("author", "Ann")]
        );
    }

    #[test]
    fn values_are_quoted_only_when_needed() {
        let mut fm = FrontMatter::new();
        fm.insert("title", "Hello World");
        fm.insert("subtitle", "Rust: a love story");
        fm.insert("quote", "\"Hi\" she said");
        fm.insert("year", "2024");
        fm.insert("flag", "yes");
        fm.insert("image", "/static/images/a.png");
        assert_eq!(
            fm.render(),
            "---\n\
             title: Hello World\n\
             subtitle: \"Rust: a love story\"\n\
             quote: \"\\\"Hi\\\" she said\"\n\
             year: \"2024\"\n\
             flag: \"yes\"\n\
             image: /static/images/a.png\n\
             ---\n"
        );
    }

    #[test]
    fn multiline_values_are_escaped() {
        assert_eq!(yaml_scalar("a\nb"), "\"a\\nb\"");
        assert_eq!(yaml_scalar(""), "\"\"");
    }
}
