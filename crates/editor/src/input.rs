//! Input events understood by the timeline controller.

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Enter,
    Space,
    Other,
}

impl Key {
    /// Map a key name (`ArrowLeft`, `Enter`, `" "`, ...) to a key.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ArrowLeft" | "Left" => Self::Left,
            "ArrowRight" | "Right" => Self::Right,
            "Enter" | "Return" => Self::Enter,
            " " | "Space" | "Spacebar" => Self::Space,
            _ => Self::Other,
        }
    }
}

/// Direction of keyboard navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// One user interaction with the timeline strip.
///
/// Horizontal coordinates are viewport pixels relative to the strip's left
/// edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorInput {
    Key(Key),
    Click { x: f64 },
    Scroll { offset: f64 },
    DragStart { index: usize },
    DragOver { pointer_x: f64 },
    Drop,
    DragEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_codes() {
        assert_eq!(Key::from_code("ArrowLeft"), Key::Left);
        assert_eq!(Key::from_code("ArrowRight"), Key::Right);
        assert_eq!(Key::from_code(" "), Key::Space);
        assert_eq!(Key::from_code("Enter"), Key::Enter);
        assert_eq!(Key::from_code("a"), Key::Other);
    }
}
