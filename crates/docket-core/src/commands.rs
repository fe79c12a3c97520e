use std::io;

use tracing::{debug, instrument};

use crate::cli::ViewKind;
use crate::pipeline::CalendarView;
use crate::render::Renderer;

#[instrument(skip(view, renderer))]
pub fn dispatch(
    kind: ViewKind,
    view: &CalendarView,
    renderer: &Renderer,
) -> anyhow::Result<()> {
    debug!(
        as_of = %view.as_of,
        tasks = view.subdivision.tasks.len(),
        "rendering view"
    );

    let mut out = io::stdout().lock();
    match kind {
        ViewKind::Weeks => renderer.write_weeks(&mut out, view),
        ViewKind::Status => renderer.write_status(&mut out, view),
        ViewKind::Context => renderer.write_context(&mut out, view),
        ViewKind::Project => renderer.write_project(&mut out, view),
        ViewKind::Summary => renderer.write_summary(&mut out, view),
    }
}
