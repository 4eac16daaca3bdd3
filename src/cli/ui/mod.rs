mod listen_view;
mod painter;
mod validation_view;

pub(crate) use self::listen_view::{ListenMessageView, ListenReadyView, ListenSummaryView};
pub(crate) use self::painter::Painter;
pub(crate) use self::validation_view::ValidationView;
