//! Application theme and color definitions.
//!
//! Light and dark palettes with monospace fonts, following the system
//! preference.

use eframe::egui::{
    self, Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Theme, Visuals,
};

/// Shared accent colors (same for both themes).
pub mod accent {
    use eframe::egui::Color32;

    pub const BLUE: Color32 = Color32::from_rgb(0x4a, 0x9e, 0xff);
    pub const GREEN: Color32 = Color32::from_rgb(0x10, 0xb9, 0x81);
    pub const RED: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);
    pub const AMBER: Color32 = Color32::from_rgb(0xf5, 0x9e, 0x0b);
}

/// Theme-aware colors.
#[derive(Clone, Copy)]
pub struct ThemeColors {
    pub bg_base: Color32,
    pub bg_panel: Color32,
    pub bg_header: Color32,
    pub bg_input: Color32,
    pub border: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub button_hover: Color32,
}

impl ThemeColors {
    const DARK: Self = Self {
        bg_base: Color32::from_rgb(0x1a, 0x1a, 0x1a),
        bg_panel: Color32::from_rgb(0x1f, 0x1f, 0x1f),
        bg_header: Color32::from_rgb(0x25, 0x25, 0x25),
        bg_input: Color32::from_rgb(0x2a, 0x2a, 0x2a),
        border: Color32::from_rgb(0x44, 0x44, 0x44),
        text_primary: Color32::from_rgb(0xe0, 0xe0, 0xe0),
        text_muted: Color32::from_rgb(0x88, 0x88, 0x88),
        button_hover: Color32::from_rgb(0x3a, 0x3a, 0x3a),
    };

    const LIGHT: Self = Self {
        bg_base: Color32::from_rgb(0xf5, 0xf5, 0xf5),
        bg_panel: Color32::from_rgb(0xff, 0xff, 0xff),
        bg_header: Color32::from_rgb(0xfa, 0xfa, 0xfa),
        bg_input: Color32::from_rgb(0xf0, 0xf0, 0xf0),
        border: Color32::from_rgb(0xc0, 0xc0, 0xc0),
        text_primary: Color32::from_rgb(0x1a, 0x1a, 0x1a),
        text_muted: Color32::from_rgb(0x66, 0x66, 0x66),
        button_hover: Color32::from_rgb(0xdd, 0xdd, 0xdd),
    };

    pub fn from_ctx(ctx: &egui::Context) -> Self {
        Self::from_dark_mode(ctx.style().visuals.dark_mode)
    }

    pub fn from_ui(ui: &egui::Ui) -> Self {
        Self::from_dark_mode(ui.visuals().dark_mode)
    }

    pub fn from_dark_mode(is_dark: bool) -> Self {
        if is_dark {
            Self::DARK
        } else {
            Self::LIGHT
        }
    }
}

/// Configure style based on the current visuals (dark/light mode).
pub fn configure_style(ctx: &egui::Context) {
    let theme = if ctx.style().visuals.dark_mode {
        Theme::Dark
    } else {
        Theme::Light
    };
    ctx.set_visuals(build_visuals(theme));
    configure_fonts_and_spacing(ctx);
}

fn build_visuals(theme: Theme) -> Visuals {
    let (mut visuals, colors, selection_alpha) = match theme {
        Theme::Dark => (Visuals::dark(), ThemeColors::DARK, 0.3),
        Theme::Light => (Visuals::light(), ThemeColors::LIGHT, 0.2),
    };

    visuals.window_fill = colors.bg_panel;
    visuals.panel_fill = colors.bg_panel;
    visuals.faint_bg_color = colors.bg_base;
    visuals.extreme_bg_color = colors.bg_input;

    let rounding = Rounding::same(4.0);
    let widgets = &mut visuals.widgets;
    for (state, fill, fg, stroke) in [
        (&mut widgets.noninteractive, colors.bg_input, colors.text_muted, colors.border),
        (&mut widgets.inactive, colors.bg_input, colors.text_primary, colors.border),
        (&mut widgets.hovered, colors.button_hover, colors.text_primary, accent::BLUE),
        (&mut widgets.active, accent::BLUE, Color32::WHITE, accent::BLUE),
        (&mut widgets.open, colors.bg_input, colors.text_primary, colors.border),
    ] {
        state.bg_fill = fill;
        state.fg_stroke = Stroke::new(1.0, fg);
        state.bg_stroke = Stroke::new(1.0, stroke);
        state.rounding = rounding;
    }

    visuals.selection.bg_fill = accent::BLUE.gamma_multiply(selection_alpha);
    visuals.selection.stroke = Stroke::new(1.0, accent::BLUE);
    visuals
}

fn configure_fonts_and_spacing(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    style.text_styles = [
        (TextStyle::Small, FontId::new(10.0, FontFamily::Monospace)),
        (TextStyle::Body, FontId::new(12.0, FontFamily::Monospace)),
        (TextStyle::Button, FontId::new(12.0, FontFamily::Monospace)),
        (TextStyle::Heading, FontId::new(14.0, FontFamily::Monospace)),
        (
            TextStyle::Monospace,
            FontId::new(12.0, FontFamily::Monospace),
        ),
    ]
    .into();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    ctx.set_style(style);
}

/// Primary action button.
pub fn primary_button(text: &str) -> egui::Button<'_> {
    egui::Button::new(egui::RichText::new(text).color(Color32::WHITE))
        .fill(accent::GREEN)
        .rounding(Rounding::same(4.0))
}

/// Record toggle: red while a session is live.
pub fn record_button(recording: bool) -> egui::Button<'static> {
    let (text, fill) = if recording {
        ("■ Stop", accent::RED)
    } else {
        ("● Record", accent::GREEN)
    };
    egui::Button::new(egui::RichText::new(text).color(Color32::WHITE).strong())
        .fill(fill)
        .rounding(Rounding::same(4.0))
}

pub fn section_header(text: &str) -> egui::RichText {
    egui::RichText::new(text.to_uppercase()).size(11.0).strong()
}

pub fn form_label(text: &str) -> egui::RichText {
    egui::RichText::new(text.to_uppercase()).size(10.0)
}
