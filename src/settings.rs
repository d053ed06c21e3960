use tracing::warn;

use crate::db::KvSlot;

pub const THEME_KEY: &str = "srp_theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Theme> {
        match s.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Stored theme, or dark when unset or unreadable.
pub fn load_theme(slot: &dyn KvSlot) -> Theme {
    match slot.get(THEME_KEY) {
        Ok(Some(v)) => Theme::parse(&v).unwrap_or_default(),
        Ok(None) => Theme::default(),
        Err(e) => {
            warn!(error = %e, "theme slot unreadable");
            Theme::default()
        }
    }
}

pub fn save_theme(slot: &mut dyn KvSlot, theme: Theme) -> anyhow::Result<()> {
    slot.set(THEME_KEY, theme.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemorySlot;

    #[test]
    fn defaults_to_dark() {
        let mut slot = MemorySlot::default();
        assert_eq!(load_theme(&slot), Theme::Dark);
        slot.set(THEME_KEY, "sepia").expect("set");
        assert_eq!(load_theme(&slot), Theme::Dark);
    }

    #[test]
    fn saves_and_toggles() {
        let mut slot = MemorySlot::default();
        save_theme(&mut slot, Theme::Dark.toggled()).expect("save");
        assert_eq!(load_theme(&slot), Theme::Light);
        assert_eq!(slot.values.get(THEME_KEY).map(String::as_str), Some("light"));
    }
}
