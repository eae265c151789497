//! Inline keyboard layout for the link menu.

use super::types::HELP_CALLBACK;
use crate::config::LinkConfig;
use crate::telegram::{Button, Keyboard};

/// Link buttons per keyboard row.
pub const BUTTONS_PER_ROW: usize = 2;

/// Text of the help button.
pub const HELP_BUTTON_TEXT: &str = "ℹ️ Help";

/// Builds the menu: link buttons in configuration order, two per row, then
/// a help row.
#[must_use]
pub fn links_keyboard(links: &LinkConfig) -> Keyboard {
    let mut rows: Vec<Vec<Button>> = links
        .links
        .chunks(BUTTONS_PER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|link| Button::new(link.label.clone(), link.callback_data()))
                .collect()
        })
        .collect();

    rows.push(vec![Button::new(HELP_BUTTON_TEXT, HELP_CALLBACK)]);
    Keyboard { rows }
}
