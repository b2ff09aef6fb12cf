//! `TerminalStage` — presentation-layer implementation of the `Stage` port.
//!
//! On a TTY every started step is an indicatif spinner that resolves to
//! `✓`, `✗` or `-`. Elsewhere only the resolved line is printed. Nothing is
//! printed when `ctx.quiet`.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::{Stage, Step};
use crate::output::{OutputContext, progress};

/// Terminal progress stage wrapping an `OutputContext`.
pub struct TerminalStage<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalStage<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl<'a> Stage for TerminalStage<'a> {
    type Step = TerminalStep<'a>;

    fn new_step(&self, name: &str) -> TerminalStep<'a> {
        TerminalStep {
            ctx: self.ctx,
            name: name.to_string(),
            spinner: RefCell::new(None),
        }
    }
}

/// One step line.
pub struct TerminalStep<'a> {
    ctx: &'a OutputContext,
    name: String,
    spinner: RefCell<Option<ProgressBar>>,
}

impl TerminalStep<'_> {
    fn resolve(&self, marker: String, line: &str) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            progress::finish_with(&pb, &marker, line);
            return;
        }
        if !self.ctx.quiet {
            println!("  {marker} {line}");
        }
    }
}

impl Step for TerminalStep<'_> {
    fn start(&self) {
        if self.ctx.show_progress() {
            *self.spinner.borrow_mut() = Some(progress::spinner(&self.name));
        }
    }

    fn finish(&self) {
        let marker = "✓".style(self.ctx.styles.success).to_string();
        self.resolve(marker, &self.name);
    }

    fn fail(&self, err: &anyhow::Error) {
        let marker = "✗".style(self.ctx.styles.error).to_string();
        self.resolve(marker, &format!("{}: {err}", self.name));
    }

    fn skip(&self, reason: &str) {
        let marker = "-".style(self.ctx.styles.skipped).to_string();
        let line = format!("{} ({})", self.name, reason.style(self.ctx.styles.dim));
        self.resolve(marker, &line);
    }
}
