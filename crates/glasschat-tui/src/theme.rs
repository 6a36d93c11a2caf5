//! Maps the stored appearance preferences onto terminal colours.

use glasschat_core::Appearance;
use ratatui::style::Color;

/// Base colour each background preset stands for in the terminal.
fn background_base(name: &str) -> (u8, u8, u8) {
    match name {
        "Leaves" => (18, 38, 24),
        "Gray Wood" => (38, 38, 40),
        "Colored Wood" => (44, 28, 22),
        // "Blue Buildings" and anything unknown
        _ => (15, 23, 42),
    }
}

fn blend(base: (u8, u8, u8), over: (u8, u8, u8), amount: f32) -> (u8, u8, u8) {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * amount).round() as u8;
    (mix(base.0, over.0), mix(base.1, over.1), mix(base.2, over.2))
}

pub fn accent(appearance: &Appearance) -> Color {
    let (r, g, b) = appearance.accent_rgb();
    Color::Rgb(r, g, b)
}

/// Panel background: the preset's base tinted toward the accent by the overlay opacity.
pub fn panel_background(appearance: &Appearance) -> Color {
    let background = appearance.background();
    let (r, g, b) = blend(
        background_base(&background.current),
        appearance.accent_rgb(),
        background.opacity,
    );
    Color::Rgb(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glasschat_core::MemoryStore;

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(blend((0, 0, 0), (200, 100, 50), 0.0), (0, 0, 0));
        assert_eq!(blend((0, 0, 0), (200, 100, 50), 1.0), (200, 100, 50));
        assert_eq!(blend((0, 0, 0), (200, 100, 50), 0.5), (100, 50, 25));
    }

    #[test]
    fn test_zero_opacity_shows_base() {
        let mut appearance = Appearance::load(Box::new(MemoryStore::new()));
        appearance.adjust_opacity(0.0);
        assert_eq!(panel_background(&appearance), Color::Rgb(15, 23, 42));

        appearance.change_background("Leaves").unwrap();
        assert_eq!(panel_background(&appearance), Color::Rgb(18, 38, 24));
    }

    #[test]
    fn test_accent_uses_theme() {
        let mut appearance = Appearance::load(Box::new(MemoryStore::new()));
        appearance.change_accent_color("#EF4444").unwrap();
        assert_eq!(accent(&appearance), Color::Rgb(0xEF, 0x44, 0x44));
    }
}
