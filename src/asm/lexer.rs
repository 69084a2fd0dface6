//! 行切分
//!
//! 每行：可选 `label:`、助记符、逗号或空白分隔的操作数、可选注释。
//! 单引号内的注释字符、逗号和空白都按字面处理。

/// 一行去掉注释后的结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    /// 源文件行号，从 1 开始
    pub number: usize,
    /// 去掉冒号的标签名，可能为空串
    pub label: Option<&'a str>,
    /// 大写助记符
    pub mnemonic: Option<String>,
    /// 助记符之后的原始操作数文本
    pub operands: &'a str,
}

/// 切分整个源程序，跳过空行和纯注释行
pub fn lines<'a>(source: &'a str, comment_chars: &'a [char]) -> impl Iterator<Item = Line<'a>> + 'a {
    source
        .lines()
        .enumerate()
        .filter_map(move |(i, raw)| split_line(i + 1, raw, comment_chars))
}

fn split_line<'a>(number: usize, raw: &'a str, comment_chars: &[char]) -> Option<Line<'a>> {
    let code = strip_comment(raw, comment_chars).trim();
    if code.is_empty() {
        return None;
    }

    let (first, rest) = split_word(code);
    let (label, body) = match first.strip_suffix(':') {
        Some(label) => (Some(label), rest),
        None => (None, code),
    };

    let (mnemonic, operands) = split_word(body);
    Some(Line {
        number,
        label,
        mnemonic: (!mnemonic.is_empty()).then(|| mnemonic.to_ascii_uppercase()),
        operands,
    })
}

/// 第一个空白前的词和余下部分（已去除首尾空白）
fn split_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(at) => (&text[..at], text[at..].trim()),
        None => (text, ""),
    }
}

/// 去掉注释，引号内的注释字符不算
fn strip_comment<'a>(raw: &'a str, comment_chars: &[char]) -> &'a str {
    let mut quoted = false;
    for (at, c) in raw.char_indices() {
        if c == '\'' {
            quoted = !quoted;
        } else if !quoted && comment_chars.contains(&c) {
            return &raw[..at];
        }
    }
    raw
}

/// 按引号外的逗号和空白切分操作数
pub fn split_operands(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut quoted = false;
    for (at, c) in text.char_indices() {
        let separator = !quoted && (c == ',' || c.is_whitespace());
        if c == '\'' {
            quoted = !quoted;
        }
        match (separator, start) {
            (true, Some(s)) => {
                out.push(&text[s..at]);
                start = None;
            }
            (false, None) => start = Some(at),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(&text[s..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMENTS: &[char] = &[';', '#'];

    #[test]
    fn test_label_mnemonic_operands() {
        let lines: Vec<_> = lines("start: set A0, 1 ; go\n\n   ; only comment\nloop:\n  HALT", COMMENTS).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            Line {
                number: 1,
                label: Some("start"),
                mnemonic: Some("SET".into()),
                operands: "A0, 1",
            }
        );
        assert_eq!(lines[1].number, 4);
        assert_eq!(lines[1].label, Some("loop"));
        assert_eq!(lines[1].mnemonic, None);
        assert_eq!(lines[2].number, 5);
        assert_eq!(lines[2].mnemonic.as_deref(), Some("HALT"));
    }

    #[test]
    fn test_empty_label() {
        let line = lines(": HALT", COMMENTS).next().unwrap();
        assert_eq!(line.label, Some(""));
        assert_eq!(line.mnemonic.as_deref(), Some("HALT"));
    }

    #[test]
    fn test_comment_chars_inside_quotes() {
        let line = lines("DATA 'a;b#c' # trailing", COMMENTS).next().unwrap();
        assert_eq!(line.operands, "'a;b#c'");

        // 6504 的 `#` 是立即数前缀
        let line = lines("LDA #5 ; five", &[';']).next().unwrap();
        assert_eq!(line.operands, "#5");
    }

    #[test]
    fn test_split_operands() {
        assert_eq!(split_operands("A0, 1"), vec!["A0", "1"]);
        assert_eq!(split_operands("X0,' '"), vec!["X0", "' '"]);
        assert_eq!(split_operands("$10,X"), vec!["$10", "X"]);
        assert_eq!(split_operands("0x00 0x0A  3"), vec!["0x00", "0x0A", "3"]);
        assert_eq!(split_operands("X0, ','"), vec!["X0", "','"]);
        assert!(split_operands("   ").is_empty());
    }
}
