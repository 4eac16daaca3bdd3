use std::fmt::{self, Display, Formatter};
use std::path::Path;

use crate::sysex::PayloadKind;

use super::painter::Painter;

/// Renders the verdict for one validated file.
pub(crate) struct ValidationView<'a> {
    path: &'a Path,
    payload: &'a [u8],
    kind: Option<PayloadKind>,
    painter: &'a Painter,
}

impl<'a> ValidationView<'a> {
    pub(crate) fn new(
        path: &'a Path,
        payload: &'a [u8],
        kind: Option<PayloadKind>,
        painter: &'a Painter,
    ) -> Self {
        Self {
            path,
            payload,
            kind,
            painter,
        }
    }
}

impl Display for ValidationView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let verdict = match self.kind {
            Some(kind) => self.painter.success(kind.to_string()),
            None => self.painter.warning("invalid"),
        };
        write!(
            f,
            "{}: {verdict} {}",
            self.path.display(),
            self.painter.muted(format!("({} bytes)", self.payload.len()))
        )?;
        if !self.payload.is_empty() {
            write!(f, "\n  {}", self.painter.bytes(self.payload))?;
        }
        Ok(())
    }
}
