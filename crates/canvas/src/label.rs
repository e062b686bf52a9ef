/// Longest label shown on the canvas before truncation.
pub const MAX_LABEL_CHARS: usize = 40;

/// Render-time label: at most [`MAX_LABEL_CHARS`] characters, then `…`.
/// The underlying node label is never modified.
#[must_use]
pub fn display_label(label: &str) -> String {
    let label = label.trim();
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(MAX_LABEL_CHARS).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_labels_pass_through() {
        assert_eq!(display_label("Speed"), "Speed");
        assert_eq!(display_label(&"x".repeat(40)), "x".repeat(40));
    }

    #[test]
    fn long_labels_are_cut_on_char_boundaries() {
        let label = "é".repeat(45);
        let shown = display_label(&label);
        assert_eq!(shown.chars().count(), 41);
        assert!(shown.ends_with('…'));

        let spaced = format!("{} tail", "word ".repeat(8));
        assert_eq!(display_label(&spaced), format!("{}…", "word ".repeat(8).trim_end()));
    }
}
