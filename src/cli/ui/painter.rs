use owo_colors::{OwoColorize, Style as OwoStyle};

use crate::utils::format_hex_preview;

const BYTES_PREVIEW: usize = 32;

/// Applies colour and style to terminal text.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    /// Creates a painter with explicit colour control.
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().cyan())
    }

    pub(crate) fn success<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().green())
    }

    pub(crate) fn warning<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().yellow())
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().dimmed())
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    /// Renders a byte preview; SysEx delimiters are highlighted.
    pub(crate) fn bytes(&self, bytes: &[u8]) -> String {
        let preview = format_hex_preview(bytes, BYTES_PREVIEW);
        if !self.use_colour {
            return preview;
        }
        preview
            .split(' ')
            .map(|token| match token {
                "F0" | "F7" => self.heading(token),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn paint(&self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            format!("{}", text.style(style))
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn apply(painter: &Painter, style: &str, text: &str) -> String {
        match style {
            "heading" => painter.heading(text),
            "success" => painter.success(text),
            "warning" => painter.warning(text),
            "muted" => painter.muted(text),
            "value" => painter.value(text),
            other => panic!("unknown style: {other}"),
        }
    }

    #[rstest]
    #[case::heading("heading")]
    #[case::success("success")]
    #[case::warning("warning")]
    #[case::muted("muted")]
    #[case::value("value")]
    fn plain_painter_leaves_text_alone(#[case] style: &str) {
        let painter = Painter::new(false);
        assert_eq!("program 3", apply(&painter, style, "program 3"));
    }

    #[rstest]
    #[case::heading("heading")]
    #[case::warning("warning")]
    #[case::value("value")]
    fn colour_painter_wraps_text(#[case] style: &str) {
        let painter = Painter::new(true);
        let styled = apply(&painter, style, "bank");
        assert_ne!("bank", styled);
        assert!(styled.contains("bank"));
    }

    #[test]
    fn plain_bytes_are_a_hex_preview() {
        let painter = Painter::new(false);
        assert_eq!("F0 42 30 F7", painter.bytes(&[0xF0, 0x42, 0x30, 0xF7]));
    }

    #[test]
    fn coloured_bytes_highlight_delimiters_only() {
        let painter = Painter::new(true);
        let rendered = painter.bytes(&[0xF0, 0x42, 0xF7]);
        assert!(rendered.contains(" 42 "));
        assert_ne!("F0 42 F7", rendered);
    }
}
