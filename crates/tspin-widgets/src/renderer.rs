#![forbid(unsafe_code)]

//! Renderer capability and the text themes.
//!
//! A renderer turns the engine's value text into a decorated control. It is
//! never called by the engine: [`bind_renderer`] builds it once from the
//! current settings and then keeps it current through setting observers on
//! `prefix`, `postfix` and `verticalButtons`.
//!
//! # Invariants
//!
//! 1. `render` on a renderer that is not built returns the value text as-is.
//! 2. Vertical layouts pad the down button to the field's display width, so
//!    both buttons line up for any prefix/postfix text.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;
use tspin_core::{ObserverId, SettingValue, Settings, SpinEngine};
use unicode_width::UnicodeWidthStr;

/// Settings keys a renderer reacts to.
pub mod keys {
    pub const PREFIX: &str = "prefix";
    pub const POSTFIX: &str = "postfix";
    pub const VERTICAL_BUTTONS: &str = "verticalButtons";
}

/// What a visual theme must provide.
pub trait Renderer {
    /// Create the decoration from a settings snapshot.
    fn build(&mut self, settings: &Settings);

    /// Drop the decoration.
    fn teardown(&mut self);

    fn update_prefix(&mut self, prefix: &str);

    fn update_postfix(&mut self, postfix: &str);

    fn update_vertical_buttons(&mut self, vertical: bool);

    /// Decorate `value_text` for display.
    fn render(&self, value_text: &str) -> String;
}

/// Built-in text themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    /// `- $5 +`
    #[default]
    Vanilla,
    /// `[-][ $5 ][+]`
    Bracketed,
    /// Arrow buttons, stacked to the right of the field by default.
    Vertical,
}

impl Theme {
    const fn buttons(self) -> (&'static str, &'static str) {
        match self {
            Self::Vanilla => ("-", "+"),
            Self::Bracketed => ("[-]", "[+]"),
            Self::Vertical => ("▼", "▲"),
        }
    }

    const fn vertical_by_default(self) -> bool {
        matches!(self, Self::Vertical)
    }
}

/// A single- or two-line text rendering of a spinner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRenderer {
    theme: Theme,
    prefix: String,
    postfix: String,
    vertical: bool,
    built: bool,
}

impl TextRenderer {
    #[must_use]
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            prefix: String::new(),
            postfix: String::new(),
            vertical: theme.vertical_by_default(),
            built: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[inline]
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[inline]
    #[must_use]
    pub fn is_vertical(&self) -> bool {
        self.vertical
    }

    fn field(&self, value_text: &str) -> String {
        let mut field = String::new();
        for (i, part) in [self.prefix.as_str(), value_text, self.postfix.as_str()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .enumerate()
        {
            if i > 0 {
                field.push(' ');
            }
            field.push_str(part);
        }
        match self.theme {
            Theme::Bracketed => format!("[ {field} ]"),
            Theme::Vanilla | Theme::Vertical => field,
        }
    }
}

impl Renderer for TextRenderer {
    fn build(&mut self, settings: &Settings) {
        self.prefix = text_setting(settings, keys::PREFIX);
        self.postfix = text_setting(settings, keys::POSTFIX);
        self.vertical = settings
            .extra(keys::VERTICAL_BUTTONS)
            .and_then(SettingValue::as_bool)
            .unwrap_or(self.theme.vertical_by_default());
        self.built = true;
    }

    fn teardown(&mut self) {
        self.prefix.clear();
        self.postfix.clear();
        self.vertical = self.theme.vertical_by_default();
        self.built = false;
    }

    fn update_prefix(&mut self, prefix: &str) {
        prefix.clone_into(&mut self.prefix);
    }

    fn update_postfix(&mut self, postfix: &str) {
        postfix.clone_into(&mut self.postfix);
    }

    fn update_vertical_buttons(&mut self, vertical: bool) {
        self.vertical = vertical;
    }

    fn render(&self, value_text: &str) -> String {
        if !self.built {
            return value_text.to_owned();
        }
        let field = self.field(value_text);
        let (down, up) = self.theme.buttons();
        if self.vertical {
            let pad = " ".repeat(field.width() + 1);
            format!("{field} {up}\n{pad}{down}")
        } else {
            format!("{down} {field} {up}")
        }
    }
}

fn text_setting(settings: &Settings, key: &str) -> String {
    settings
        .extra(key)
        .and_then(SettingValue::as_str)
        .unwrap_or_default()
        .to_owned()
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Observer registrations tying a renderer to an engine.
#[derive(Debug)]
#[must_use = "dropping the binding leaves the observers registered"]
pub struct RendererBinding {
    observers: Vec<ObserverId>,
}

impl RendererBinding {
    /// Remove the observers and tear the renderer down.
    pub fn unbind<R: Renderer>(self, engine: &mut SpinEngine, renderer: &RefCell<R>) {
        for id in self.observers {
            engine.unobserve_setting(id);
        }
        renderer.borrow_mut().teardown();
        debug!("renderer.unbind");
    }
}

/// Build `renderer` from the engine's settings and keep it in sync.
pub fn bind_renderer<R: Renderer + 'static>(
    engine: &mut SpinEngine,
    renderer: &Rc<RefCell<R>>,
) -> RendererBinding {
    renderer.borrow_mut().build(engine.settings());

    let mut observers = Vec::with_capacity(3);

    let target = Rc::clone(renderer);
    observers.push(engine.observe_setting(keys::PREFIX, move |value: &SettingValue| {
        target
            .borrow_mut()
            .update_prefix(value.as_str().unwrap_or_default());
    }));

    let target = Rc::clone(renderer);
    observers.push(engine.observe_setting(keys::POSTFIX, move |value: &SettingValue| {
        target
            .borrow_mut()
            .update_postfix(value.as_str().unwrap_or_default());
    }));

    let target = Rc::clone(renderer);
    observers.push(
        engine.observe_setting(keys::VERTICAL_BUTTONS, move |value: &SettingValue| {
            if let Some(vertical) = value.as_bool() {
                target.borrow_mut().update_vertical_buttons(vertical);
            }
        }),
    );

    debug!(observers = observers.len(), "renderer.bind");
    RendererBinding { observers }
}
