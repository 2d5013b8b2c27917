//! Theme business logic - Colour presets and CSS variable generation.
//!
//! Each preset is a neutral tone plus a primary colour, both in HSL. The
//! variables follow the `"H S% L%"` convention so stylesheets can wrap them in
//! `hsl(var(--primary))`.

use crate::{
    entities::{UserTheme, user_theme, user_theme::ThemeMode},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A colour in HSL with whole-number components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsl {
    /// Hue, 0-360
    pub h: u16,
    /// Saturation, 0-100
    pub s: u8,
    /// Lightness, 0-100
    pub l: u8,
}

impl Hsl {
    const fn new(h: u16, s: u8, l: u8) -> Self {
        Self { h, s, l }
    }
}

impl std::fmt::Display for Hsl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}% {}%", self.h, self.s, self.l)
    }
}

/// A named colour preset
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    /// Identifier stored on the user's theme
    pub name: &'static str,
    /// Hue of greys, borders and backgrounds
    pub neutral_hue: u16,
    /// Saturation of greys
    pub neutral_saturation: u8,
    /// Hue of the primary colour
    pub primary_hue: u16,
    /// Saturation of the primary colour
    pub primary_saturation: u8,
    /// Primary lightness on light backgrounds
    pub primary_light: u8,
    /// Primary lightness on dark backgrounds
    pub primary_dark: u8,
}

/// Every selectable preset; the first is the default.
pub const PRESETS: [Preset; 7] = [
    Preset { name: "zinc", neutral_hue: 240, neutral_saturation: 5, primary_hue: 240, primary_saturation: 6, primary_light: 10, primary_dark: 98 },
    Preset { name: "slate", neutral_hue: 215, neutral_saturation: 25, primary_hue: 222, primary_saturation: 47, primary_light: 11, primary_dark: 98 },
    Preset { name: "rose", neutral_hue: 240, neutral_saturation: 5, primary_hue: 346, primary_saturation: 77, primary_light: 50, primary_dark: 50 },
    Preset { name: "blue", neutral_hue: 222, neutral_saturation: 47, primary_hue: 221, primary_saturation: 83, primary_light: 53, primary_dark: 60 },
    Preset { name: "green", neutral_hue: 240, neutral_saturation: 5, primary_hue: 142, primary_saturation: 76, primary_light: 36, primary_dark: 45 },
    Preset { name: "orange", neutral_hue: 20, neutral_saturation: 14, primary_hue: 25, primary_saturation: 95, primary_light: 53, primary_dark: 53 },
    Preset { name: "violet", neutral_hue: 224, neutral_saturation: 71, primary_hue: 262, primary_saturation: 83, primary_light: 58, primary_dark: 58 },
];

const DEFAULT_RADIUS_TENTHS: i32 = 5;
const MAX_RADIUS_TENTHS: i32 = 20;

/// Looks up a preset by name.
#[must_use]
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}

/// Text colour that stays readable on the given primary lightness.
const fn on_primary(preset: &Preset, primary_lightness: u8) -> Hsl {
    if primary_lightness >= 60 {
        Hsl::new(preset.neutral_hue, preset.neutral_saturation, 10)
    } else {
        Hsl::new(0, 0, 98)
    }
}

/// Computes the ordered colour variables of a preset for one scheme.
#[must_use]
pub fn compute_variables(preset: &Preset, dark: bool) -> Vec<(&'static str, Hsl)> {
    let (nh, ns) = (preset.neutral_hue, preset.neutral_saturation);
    let neutral = |l| Hsl::new(nh, ns, l);
    let white = Hsl::new(0, 0, 98);

    let primary_l = if dark { preset.primary_dark } else { preset.primary_light };
    let primary = Hsl::new(preset.primary_hue, preset.primary_saturation, primary_l);
    let primary_fg = on_primary(preset, primary_l);

    let (background, foreground, surface, surface_fg, muted_fg, destructive, border) = if dark {
        (neutral(4), white, neutral(16), white, neutral(65), Hsl::new(0, 63, 31), neutral(16))
    } else {
        (Hsl::new(0, 0, 100), neutral(4), neutral(96), neutral(10), neutral(46), Hsl::new(0, 84, 60), neutral(90))
    };

    vec![
        ("background", background),
        ("foreground", foreground),
        ("card", background),
        ("card-foreground", foreground),
        ("primary", primary),
        ("primary-foreground", primary_fg),
        ("secondary", surface),
        ("secondary-foreground", surface_fg),
        ("muted", surface),
        ("muted-foreground", muted_fg),
        ("accent", surface),
        ("accent-foreground", surface_fg),
        ("destructive", destructive),
        ("border", border),
        ("input", border),
        ("ring", primary),
    ]
}

/// Formats a radius stored in tenths of a rem.
#[must_use]
pub fn format_radius(tenths: i32) -> String {
    let (whole, frac) = (tenths / 10, tenths % 10);
    if frac == 0 {
        format!("{whole}rem")
    } else {
        format!("{whole}.{frac}rem")
    }
}

/// A user's resolved appearance settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeSettings {
    /// Preset name
    pub preset: String,
    /// Scheme selection
    pub mode: ThemeMode,
    /// Corner radius in tenths of a rem
    pub radius_tenths: i32,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            preset: PRESETS[0].name.to_string(),
            mode: ThemeMode::System,
            radius_tenths: DEFAULT_RADIUS_TENTHS,
        }
    }
}

impl From<user_theme::Model> for ThemeSettings {
    fn from(model: user_theme::Model) -> Self {
        Self {
            preset: model.preset,
            mode: model.mode,
            radius_tenths: model.radius_tenths,
        }
    }
}

/// Partial theme change from the preferences panel
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeUpdate {
    /// New preset name
    pub preset: Option<String>,
    /// New scheme
    pub mode: Option<ThemeMode>,
    /// New radius in tenths of a rem
    pub radius_tenths: Option<i32>,
}

fn write_block(css: &mut String, selector: &str, vars: &[(&'static str, Hsl)], radius: Option<&str>, indent: &str) {
    // Writing to a String cannot fail
    let _ = writeln!(css, "{indent}{selector} {{");
    for (name, value) in vars {
        let _ = writeln!(css, "{indent}  --{name}: {value};");
    }
    if let Some(radius) = radius {
        let _ = writeln!(css, "{indent}  --radius: {radius};");
    }
    let _ = writeln!(css, "{indent}}}");
}

/// Renders the stylesheet for a theme.
///
/// Unknown presets fall back to the default so a stale row never breaks
/// page rendering.
#[must_use]
pub fn render_css(theme: &ThemeSettings) -> String {
    let preset = find_preset(&theme.preset).unwrap_or(&PRESETS[0]);
    let light = compute_variables(preset, false);
    let dark = compute_variables(preset, true);
    let radius = format_radius(theme.radius_tenths);

    let mut css = String::new();
    match theme.mode {
        ThemeMode::Light => {
            write_block(&mut css, ":root", &light, Some(&radius), "");
            write_block(&mut css, ".dark", &dark, None, "");
        }
        ThemeMode::Dark => {
            write_block(&mut css, ":root", &dark, Some(&radius), "");
        }
        ThemeMode::System => {
            write_block(&mut css, ":root", &light, Some(&radius), "");
            css.push_str("@media (prefers-color-scheme: dark) {\n");
            write_block(&mut css, ":root", &dark, None, "  ");
            css.push_str("}\n");
        }
    }
    css
}

/// Loads a user's theme, or the default when they never changed it.
pub async fn get_user_theme(db: &DatabaseConnection, user_id: i64) -> Result<ThemeSettings> {
    let stored = UserTheme::find()
        .filter(user_theme::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(stored.map(ThemeSettings::from).unwrap_or_default())
}

/// Validates and stores a theme change.
pub async fn set_user_theme(
    db: &DatabaseConnection,
    user_id: i64,
    update: ThemeUpdate,
) -> Result<ThemeSettings> {
    if let Some(preset) = &update.preset {
        if find_preset(preset).is_none() {
            let names: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
            return Err(Error::validation(
                "preset",
                format!("must be one of {}", names.join(", ")),
            ));
        }
    }
    if let Some(radius) = update.radius_tenths {
        if !(0..=MAX_RADIUS_TENTHS).contains(&radius) {
            return Err(Error::validation("radius_tenths", "must be between 0 and 20"));
        }
    }

    let existing = UserTheme::find()
        .filter(user_theme::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    let now = chrono::Utc::now();

    let saved = if let Some(existing) = existing {
        let mut active: user_theme::ActiveModel = existing.into();
        if let Some(preset) = update.preset {
            active.preset = Set(preset);
        }
        if let Some(mode) = update.mode {
            active.mode = Set(mode);
        }
        if let Some(radius) = update.radius_tenths {
            active.radius_tenths = Set(radius);
        }
        active.updated_at = Set(now);
        active.update(db).await?
    } else {
        let defaults = ThemeSettings::default();
        user_theme::ActiveModel {
            user_id: Set(user_id),
            preset: Set(update.preset.unwrap_or(defaults.preset)),
            mode: Set(update.mode.unwrap_or(defaults.mode)),
            radius_tenths: Set(update.radius_tenths.unwrap_or(defaults.radius_tenths)),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?
    };

    Ok(saved.into())
}
